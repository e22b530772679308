use crate::algebra::AccumulatorElement;
use crate::error::Error;
use crate::{RevocationIndex, RevxResult};
use core::fmt::{self, Display, Formatter};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Public material for one tails position
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TailsEntry<E>(pub E);

/// Why a tails entry could not be produced
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TailsError {
    /// The source could not be reached, asking again may succeed
    Unavailable(u32),
    /// The position does not exist in these tails
    NotFound(u32),
}

impl TailsError {
    /// True when the same request may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl Display for TailsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(i) => write!(f, "tails entry {} is unavailable", i),
            Self::NotFound(i) => write!(f, "tails entry {} does not exist", i),
        }
    }
}

impl std::error::Error for TailsError {}

/// Read-only provider of tails entries keyed by tails position
pub trait TailsSource<E: AccumulatorElement> {
    /// Fetch the entry at `position`
    fn fetch(&self, position: u32) -> Result<TailsEntry<E>, TailsError>;

    /// The capacity of the registry these tails were generated for
    fn max_cred_num(&self) -> u32;
}

impl<E: AccumulatorElement, T: TailsSource<E> + ?Sized> TailsSource<E> for &T {
    fn fetch(&self, position: u32) -> Result<TailsEntry<E>, TailsError> {
        (**self).fetch(position)
    }

    fn max_cred_num(&self) -> u32 {
        (**self).max_cred_num()
    }
}

/// Check that `tails` were generated for a registry of `max_cred_num` entries
pub fn check_tails<E, T>(tails: &T, max_cred_num: u32) -> RevxResult<()>
where
    E: AccumulatorElement,
    T: TailsSource<E> + ?Sized,
{
    if tails.max_cred_num() != max_cred_num {
        return Err(Error::InvalidRegistryOperation(
            "tails belong to a registry of another capacity",
        ));
    }
    Ok(())
}

/// The number of tails positions for a registry of `max_cred_num` entries
pub fn tails_len(max_cred_num: u32) -> u32 {
    max_cred_num.saturating_mul(2)
}

/// True if `position` is a tails position of a registry with `max_cred_num` entries.
///
/// Position `max_cred_num + 1` is never published.
pub fn is_tails_position(position: u32, max_cred_num: u32) -> bool {
    position != 0
        && position <= tails_len(max_cred_num)
        && position != max_cred_num.saturating_add(1)
}

/// The tails position holding the accumulator contribution of `index`.
///
/// `index` must be in `1..=max_cred_num` with a capacity that passed
/// [`crate::check_capacity`].
pub fn accumulator_position(max_cred_num: u32, index: RevocationIndex) -> u32 {
    max_cred_num + 1 - index
}

/// The tails position holding the contribution of `other` to the witness of `own`.
///
/// Both indices must be in `1..=max_cred_num`.
pub fn witness_position(max_cred_num: u32, own: RevocationIndex, other: RevocationIndex) -> u32 {
    max_cred_num + 1 - other + own
}

/// Tails held entirely in memory, position `1` first
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InMemoryTails<E> {
    max_cred_num: u32,
    entries: Vec<TailsEntry<E>>,
}

impl<E: AccumulatorElement> InMemoryTails<E> {
    /// Build from every published entry in position order.
    ///
    /// `entries` must hold `2 * max_cred_num - 1` entries since position
    /// `max_cred_num + 1` is skipped.
    pub fn new(max_cred_num: u32, entries: Vec<TailsEntry<E>>) -> Option<Self> {
        if max_cred_num == 0 || entries.len() as u64 != u64::from(tails_len(max_cred_num)) - 1 {
            return None;
        }
        Some(Self {
            max_cred_num,
            entries,
        })
    }

    pub(crate) fn from_parts(max_cred_num: u32, entries: Vec<TailsEntry<E>>) -> Self {
        Self {
            max_cred_num,
            entries,
        }
    }

    /// The registry capacity these tails belong to
    pub fn max_cred_num(&self) -> u32 {
        self.max_cred_num
    }

    /// The number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: AccumulatorElement> TailsSource<E> for InMemoryTails<E> {
    fn fetch(&self, position: u32) -> Result<TailsEntry<E>, TailsError> {
        if !is_tails_position(position, self.max_cred_num) {
            return Err(TailsError::NotFound(position));
        }
        let offset = if position > self.max_cred_num {
            position - 2
        } else {
            position - 1
        };
        self.entries
            .get(offset as usize)
            .copied()
            .ok_or(TailsError::NotFound(position))
    }

    fn max_cred_num(&self) -> u32 {
        self.max_cred_num
    }
}

/// Remembers every entry fetched from the inner source.
///
/// Tails are deterministic so entries never go stale.
#[derive(Debug)]
pub struct CachedTails<E, S> {
    inner: S,
    cache: Mutex<HashMap<u32, TailsEntry<E>>>,
}

impl<E: AccumulatorElement, S: TailsSource<E>> CachedTails<E, S> {
    /// Wrap `inner` with an empty cache
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The number of cached entries
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Unwrap the inner source
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<E: AccumulatorElement, S: TailsSource<E>> TailsSource<E> for CachedTails<E, S> {
    fn fetch(&self, position: u32) -> Result<TailsEntry<E>, TailsError> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&position) {
                return Ok(*entry);
            }
        }
        // Not holding the lock while the inner source works
        let entry = self.inner.fetch(position)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(position, entry);
        }
        Ok(entry)
    }

    fn max_cred_num(&self) -> u32 {
        self.inner.max_cred_num()
    }
}

/// Retries transient failures of the inner source
#[derive(Clone, Debug)]
pub struct RetryingTails<S> {
    inner: S,
    max_attempts: usize,
}

impl<S> RetryingTails<S> {
    /// Default number of attempts per fetch
    pub const DEFAULT_ATTEMPTS: usize = 3;

    /// Wrap `inner` with the default attempt count
    pub fn new(inner: S) -> Self {
        Self::with_max_attempts(inner, Self::DEFAULT_ATTEMPTS)
    }

    /// Wrap `inner`, trying each fetch at most `max_attempts` times
    pub fn with_max_attempts(inner: S, max_attempts: usize) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }
}

impl<E: AccumulatorElement, S: TailsSource<E>> TailsSource<E> for RetryingTails<S> {
    fn fetch(&self, position: u32) -> Result<TailsEntry<E>, TailsError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(position) {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        "tails fetch attempt {}/{} failed: {}",
                        attempt, self.max_attempts, e
                    );
                    attempt += 1;
                }
                res => return res,
            }
        }
    }

    fn max_cred_num(&self) -> u32 {
        self.inner.max_cred_num()
    }
}

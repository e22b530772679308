use crate::algebra::{AccumulatorElement, AccumulatorValue};
use crate::error::Error;
use crate::tails::{accumulator_position, check_tails, TailsSource};
use crate::{check_capacity, check_index, RevocationIndex, RevxResult};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;

/// The largest capacity whose tails positions fit in a `u32`
pub const MAX_CAPACITY: u32 = u32::MAX / 2 - 1;

/// How indices enter the accumulator
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum IssuanceType {
    /// Every index is accumulated when the registry is created
    ByDefault,
    /// Each index is accumulated when its credential is issued
    #[default]
    OnDemand,
}

/// How much delta history is kept
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep at most this many deltas, `None` keeps everything
    #[serde(default)]
    pub max_deltas: Option<usize>,
}

impl RetentionPolicy {
    /// Keep all history
    pub fn unbounded() -> Self {
        Self { max_deltas: None }
    }

    /// Keep the latest `max_deltas` deltas
    pub fn window(max_deltas: usize) -> Self {
        Self {
            max_deltas: Some(max_deltas),
        }
    }
}

/// Parameters of one revocation registry
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// The number of revocation indices
    pub max_cred_num: u32,
    /// When indices are accumulated
    #[serde(default)]
    pub issuance_type: IssuanceType,
    /// How much history is kept for holders
    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl RegistryConfig {
    /// An on demand registry with unbounded history
    pub fn new(max_cred_num: u32) -> Self {
        Self {
            max_cred_num,
            issuance_type: IssuanceType::default(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Check the parameters are usable
    pub fn validate(&self) -> RevxResult<()> {
        check_capacity(self.max_cred_num)
    }
}

/// The recorded difference between two successive accumulator values
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistryDelta<E> {
    /// The accumulator before the update
    pub from: AccumulatorValue<E>,
    /// The accumulator after the update
    pub to: AccumulatorValue<E>,
    /// Indices accumulated by this update
    pub issued: BTreeSet<RevocationIndex>,
    /// Indices removed by this update
    pub revoked: BTreeSet<RevocationIndex>,
}

impl<E: AccumulatorElement> RegistryDelta<E> {
    /// An index may not be issued and revoked by the same delta
    pub fn validate(&self) -> RevxResult<()> {
        if !self.issued.is_disjoint(&self.revoked) {
            return Err(Error::InconsistentDelta(
                "index is both issued and revoked",
            ));
        }
        Ok(())
    }

    /// Every index named by this delta is inside the registry
    pub fn check_capacity(&self, max_cred_num: u32) -> RevxResult<()> {
        self.issued
            .iter()
            .chain(self.revoked.iter())
            .try_for_each(|i| check_index(*i, max_cred_num))
    }

    /// Compose this delta with the one that follows it.
    ///
    /// An index issued here and revoked by `next` cancels out. Indices are
    /// never issued twice nor issued after revocation.
    pub fn merge(&self, next: &Self) -> RevxResult<Self> {
        if self.to != next.from {
            return Err(Error::InconsistentDelta("deltas do not chain"));
        }
        self.validate()?;
        next.validate()?;
        if !self.revoked.is_disjoint(&next.issued) {
            return Err(Error::InconsistentDelta("revoked index issued again"));
        }
        if !self.issued.is_disjoint(&next.issued) || !self.revoked.is_disjoint(&next.revoked) {
            return Err(Error::InconsistentDelta("index updated twice"));
        }
        let cancelled: BTreeSet<_> = self.issued.intersection(&next.revoked).copied().collect();
        let issued = self
            .issued
            .union(&next.issued)
            .filter(|i| !cancelled.contains(i))
            .copied()
            .collect();
        let revoked = self
            .revoked
            .union(&next.revoked)
            .filter(|i| !cancelled.contains(i))
            .copied()
            .collect();
        Ok(Self {
            from: self.from,
            to: next.to,
            issued,
            revoked,
        })
    }

    /// Compose a whole chain into one delta, `None` for an empty chain
    pub fn merge_chain(deltas: &[Self]) -> RevxResult<Option<Self>> {
        let mut iter = deltas.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut merged = first.clone();
        merged.validate()?;
        for d in iter {
            merged = merged.merge(d)?;
        }
        Ok(Some(merged))
    }
}

/// Check that `deltas` start at `from` and each one starts where the previous ended
pub fn check_chain<E: AccumulatorElement>(
    from: &AccumulatorValue<E>,
    deltas: &[RegistryDelta<E>],
) -> RevxResult<()> {
    let mut current = from;
    for d in deltas {
        if d.from != *current {
            return Err(Error::InconsistentDelta("deltas do not chain"));
        }
        current = &d.to;
    }
    Ok(())
}

/// The accumulator and index sets of a registry at one checkpoint
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistryState<E> {
    /// The registry capacity
    pub max_cred_num: u32,
    /// The current accumulator value
    pub accumulator: AccumulatorValue<E>,
    /// The accumulated indices
    pub issued: BTreeSet<RevocationIndex>,
    /// Every index ever revoked
    pub revoked: BTreeSet<RevocationIndex>,
}

impl<E: AccumulatorElement> RegistryState<E> {
    /// The genesis state for `config`
    pub fn new<T: TailsSource<E>>(config: &RegistryConfig, tails: &T) -> RevxResult<Self> {
        config.validate()?;
        check_tails(tails, config.max_cred_num)?;
        let mut state = Self {
            max_cred_num: config.max_cred_num,
            accumulator: AccumulatorValue::identity(),
            issued: BTreeSet::new(),
            revoked: BTreeSet::new(),
        };
        if config.issuance_type == IssuanceType::ByDefault {
            let mut acc = E::identity();
            for index in 1..=config.max_cred_num {
                let tail = tails.fetch(accumulator_position(config.max_cred_num, index))?;
                acc = acc.combine(&tail.0);
            }
            state.accumulator = AccumulatorValue(acc);
            state.issued = (1..=config.max_cred_num).collect();
        }
        Ok(state)
    }

    /// Accumulate `issued` and remove `revoked`, returning the next state and
    /// the delta leading to it
    pub fn update<T: TailsSource<E>>(
        &self,
        issued: &BTreeSet<RevocationIndex>,
        revoked: &BTreeSet<RevocationIndex>,
        tails: &T,
    ) -> RevxResult<(Self, RegistryDelta<E>)> {
        if issued.is_empty() && revoked.is_empty() {
            return Err(Error::InvalidRegistryOperation("empty registry update"));
        }
        check_capacity(self.max_cred_num)?;
        check_tails(tails, self.max_cred_num)?;
        let mut next = self.clone();
        let mut acc = self.accumulator.0;
        for i in issued {
            check_index(*i, self.max_cred_num)?;
            if self.revoked.contains(i) {
                return Err(Error::InvalidRegistryOperation("index was revoked"));
            }
            if !next.issued.insert(*i) {
                return Err(Error::InvalidRegistryOperation("index is already issued"));
            }
            let tail = tails.fetch(accumulator_position(self.max_cred_num, *i))?;
            acc = acc.combine(&tail.0);
        }
        for r in revoked {
            check_index(*r, self.max_cred_num)?;
            if !self.issued.contains(r) {
                return Err(Error::InvalidRegistryOperation("index is not issued"));
            }
            next.issued.remove(r);
            next.revoked.insert(*r);
            let tail = tails.fetch(accumulator_position(self.max_cred_num, *r))?;
            acc = acc.combine(&tail.0.invert());
        }
        next.accumulator = AccumulatorValue(acc);
        let delta = RegistryDelta {
            from: self.accumulator,
            to: next.accumulator,
            issued: issued.clone(),
            revoked: revoked.clone(),
        };
        delta.validate()?;
        Ok((next, delta))
    }
}

/// Fetches the deltas a holder needs to move a witness between checkpoints
pub trait RegistryLedger<E: AccumulatorElement> {
    /// The ordered deltas leading from `from` to `to`
    fn deltas_between(
        &self,
        from: &AccumulatorValue<E>,
        to: &AccumulatorValue<E>,
    ) -> RevxResult<Vec<RegistryDelta<E>>>;
}

/// Append-only arena of published deltas.
///
/// Checkpoint `p` is the accumulator value after `p` deltas. Lookups return
/// ranges into the arena instead of references to mutable state.
#[derive(Clone, Debug)]
pub struct DeltaHistory<E> {
    retention: RetentionPolicy,
    deltas: Vec<RegistryDelta<E>>,
    pruned: usize,
    checkpoints: IndexMap<Vec<u8>, Vec<usize>>,
    head: AccumulatorValue<E>,
}

impl<E: AccumulatorElement> DeltaHistory<E> {
    /// Start a history at the genesis accumulator
    pub fn new(genesis: AccumulatorValue<E>, retention: RetentionPolicy) -> Self {
        let mut checkpoints = IndexMap::new();
        checkpoints.insert(genesis.to_bytes(), vec![0]);
        Self {
            retention,
            deltas: Vec::new(),
            pruned: 0,
            checkpoints,
            head: genesis,
        }
    }

    /// The latest published accumulator
    pub fn head(&self) -> &AccumulatorValue<E> {
        &self.head
    }

    /// The number of retained deltas
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// True if no deltas are retained
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// The retained deltas, oldest first
    pub fn deltas(&self) -> &[RegistryDelta<E>] {
        &self.deltas
    }

    /// True if `value` is a retained checkpoint
    pub fn contains(&self, value: &AccumulatorValue<E>) -> bool {
        self.checkpoints.contains_key(&value.to_bytes())
    }

    /// Append a delta that starts at the current head
    pub fn publish(&mut self, delta: RegistryDelta<E>) -> RevxResult<()> {
        delta.validate()?;
        if delta.from != self.head {
            return Err(Error::InconsistentDelta("delta does not start at the head"));
        }
        let position = self.pruned + self.deltas.len() + 1;
        debug!(
            "publishing checkpoint {}: issued {:?} revoked {:?}",
            position, delta.issued, delta.revoked
        );
        self.checkpoints
            .entry(delta.to.to_bytes())
            .or_default()
            .push(position);
        self.head = delta.to;
        self.deltas.push(delta);
        self.prune();
        Ok(())
    }

    fn prune(&mut self) {
        let Some(max) = self.retention.max_deltas else {
            return;
        };
        if self.deltas.len() <= max {
            return;
        }
        let excess = self.deltas.len() - max;
        self.deltas.drain(..excess);
        self.pruned += excess;
        let pruned = self.pruned;
        self.checkpoints.retain(|_, positions| {
            positions.retain(|p| *p >= pruned);
            !positions.is_empty()
        });
        debug!("pruned {} deltas, oldest checkpoint is {}", excess, pruned);
    }

    /// The arena range of deltas leading from `from` to `to`
    pub fn range_between(
        &self,
        from: &AccumulatorValue<E>,
        to: &AccumulatorValue<E>,
    ) -> RevxResult<Range<usize>> {
        let end = self
            .checkpoints
            .get(&to.to_bytes())
            .and_then(|p| p.last())
            .copied()
            .ok_or(Error::UnknownAccumulatorState)?;
        let starts = self
            .checkpoints
            .get(&from.to_bytes())
            .ok_or(Error::UnknownAccumulatorState)?;
        // The latest occurrence of `from` not after `to` gives the shortest chain
        let start = starts
            .iter()
            .rev()
            .find(|p| **p <= end)
            .copied()
            .ok_or(Error::InconsistentDelta("target precedes source"))?;
        Ok(start - self.pruned..end - self.pruned)
    }

    /// The deltas leading from `from` to `to`
    pub fn chain(
        &self,
        from: &AccumulatorValue<E>,
        to: &AccumulatorValue<E>,
    ) -> RevxResult<&[RegistryDelta<E>]> {
        let range = self.range_between(from, to)?;
        Ok(&self.deltas[range])
    }
}

impl<E: AccumulatorElement> RegistryLedger<E> for DeltaHistory<E> {
    fn deltas_between(
        &self,
        from: &AccumulatorValue<E>,
        to: &AccumulatorValue<E>,
    ) -> RevxResult<Vec<RegistryDelta<E>>> {
        self.chain(from, to).map(|d| d.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knox::accumulator::cks09::{Element, SecretKey, TailsGenerator};
    use maplit::btreeset;

    fn setup(max_cred_num: u32) -> (TailsGenerator, RegistryState<Element>) {
        let tails = TailsGenerator::new(SecretKey::new(Some(b"registry")), max_cred_num).unwrap();
        let state = RegistryState::new(&RegistryConfig::new(max_cred_num), &tails).unwrap();
        (tails, state)
    }

    #[test]
    fn config_from_json_uses_defaults() {
        let config: RegistryConfig = serde_json::from_str(r#"{"max_cred_num": 10}"#).unwrap();
        assert_eq!(config, RegistryConfig::new(10));
        let config: RegistryConfig = serde_json::from_str(
            r#"{"max_cred_num": 10, "issuance_type": "ByDefault", "retention": {"max_deltas": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.issuance_type, IssuanceType::ByDefault);
        assert_eq!(config.retention, RetentionPolicy::window(4));
        assert!(RegistryConfig::new(0).validate().is_err());
    }

    #[test]
    fn update_and_undo() {
        let (tails, s0) = setup(5);
        let (s1, d1) = s0.update(&btreeset! {1, 2}, &btreeset! {}, &tails).unwrap();
        let (s2, d2) = s1.update(&btreeset! {}, &btreeset! {2}, &tails).unwrap();
        assert_eq!(d1.from, s0.accumulator);
        assert_eq!(d2.to, s2.accumulator);
        assert_eq!(s2.issued, btreeset! {1});
        assert_eq!(s2.revoked, btreeset! {2});

        let (s3, _) = s0.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap();
        assert_eq!(s3.accumulator, s2.accumulator);
    }

    #[test]
    fn invalid_updates() {
        let (tails, s0) = setup(5);
        let (s1, _) = s0.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap();
        let (s2, _) = s1.update(&btreeset! {}, &btreeset! {1}, &tails).unwrap();
        assert_eq!(
            s1.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap_err(),
            Error::InvalidRegistryOperation("index is already issued")
        );
        assert_eq!(
            s2.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap_err(),
            Error::InvalidRegistryOperation("index was revoked")
        );
        assert_eq!(
            s1.update(&btreeset! {}, &btreeset! {3}, &tails).unwrap_err(),
            Error::InvalidRegistryOperation("index is not issued")
        );
        assert_eq!(
            s1.update(&btreeset! {6}, &btreeset! {}, &tails).unwrap_err(),
            Error::CapacityExceeded {
                index: 6,
                max_cred_num: 5
            }
        );
        assert!(s1.update(&btreeset! {}, &btreeset! {}, &tails).is_err());
    }

    #[test]
    fn merge_cancels_issue_then_revoke() {
        let (tails, s0) = setup(5);
        let (s1, d1) = s0.update(&btreeset! {1, 2}, &btreeset! {}, &tails).unwrap();
        let (_, d2) = s1.update(&btreeset! {3}, &btreeset! {2}, &tails).unwrap();
        let merged = d1.merge(&d2).unwrap();
        assert_eq!(merged.from, d1.from);
        assert_eq!(merged.to, d2.to);
        assert_eq!(merged.issued, btreeset! {1, 3});
        assert!(merged.revoked.is_empty());
        assert_eq!(
            RegistryDelta::merge_chain(&[d1.clone(), d2.clone()]).unwrap(),
            Some(merged)
        );
        assert_eq!(RegistryDelta::<Element>::merge_chain(&[]).unwrap(), None);
        assert_eq!(
            d2.merge(&d1).unwrap_err(),
            Error::InconsistentDelta("deltas do not chain")
        );
    }

    #[test]
    fn merge_rejects_reissue() {
        let (tails, s0) = setup(5);
        let (s1, _) = s0.update(&btreeset! {1, 2}, &btreeset! {}, &tails).unwrap();
        let (s2, d2) = s1.update(&btreeset! {}, &btreeset! {2}, &tails).unwrap();
        let forged = RegistryDelta {
            from: s2.accumulator,
            to: s1.accumulator,
            issued: btreeset! {2},
            revoked: btreeset! {},
        };
        assert_eq!(
            d2.merge(&forged).unwrap_err(),
            Error::InconsistentDelta("revoked index issued again")
        );
    }

    #[test]
    fn delta_validation() {
        let (_, s0) = setup(5);
        let delta = RegistryDelta {
            from: s0.accumulator,
            to: s0.accumulator,
            issued: btreeset! {1, 2},
            revoked: btreeset! {2},
        };
        assert!(delta.validate().is_err());
        assert!(delta.check_capacity(5).is_ok());
        assert!(delta.check_capacity(1).is_err());
    }

    #[test]
    fn history_ranges() {
        let (tails, s0) = setup(5);
        let mut history = DeltaHistory::new(s0.accumulator, RetentionPolicy::unbounded());
        let (s1, d1) = s0.update(&btreeset! {1, 2, 3}, &btreeset! {}, &tails).unwrap();
        let (s2, d2) = s1.update(&btreeset! {}, &btreeset! {2}, &tails).unwrap();
        let (s3, d3) = s2.update(&btreeset! {4}, &btreeset! {}, &tails).unwrap();
        history.publish(d1).unwrap();
        history.publish(d2.clone()).unwrap();
        history.publish(d3.clone()).unwrap();

        assert_eq!(history.head(), &s3.accumulator);
        assert_eq!(history.range_between(&s0.accumulator, &s3.accumulator).unwrap(), 0..3);
        assert_eq!(history.chain(&s1.accumulator, &s3.accumulator).unwrap(), &[d2, d3]);
        assert!(history
            .chain(&s2.accumulator, &s2.accumulator)
            .unwrap()
            .is_empty());
        assert_eq!(
            history.range_between(&s3.accumulator, &s1.accumulator).unwrap_err(),
            Error::InconsistentDelta("target precedes source")
        );
        let (unknown, _) = s0.update(&btreeset! {5}, &btreeset! {}, &tails).unwrap();
        assert_eq!(
            history
                .deltas_between(&unknown.accumulator, &s3.accumulator)
                .unwrap_err(),
            Error::UnknownAccumulatorState
        );
    }

    #[test]
    fn publish_requires_head() {
        let (tails, s0) = setup(5);
        let mut history = DeltaHistory::new(s0.accumulator, RetentionPolicy::unbounded());
        let (s1, d1) = s0.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap();
        let (_, d2) = s1.update(&btreeset! {2}, &btreeset! {}, &tails).unwrap();
        assert_eq!(
            history.publish(d2).unwrap_err(),
            Error::InconsistentDelta("delta does not start at the head")
        );
        assert!(history.is_empty());
        history.publish(d1).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn retention_prunes_old_checkpoints() {
        let (tails, s0) = setup(5);
        let mut history = DeltaHistory::new(s0.accumulator, RetentionPolicy::window(2));
        let mut states = vec![s0];
        for i in 1..=4 {
            let (next, delta) = states
                .last()
                .unwrap()
                .update(&btreeset! {i}, &btreeset! {}, &tails)
                .unwrap();
            history.publish(delta).unwrap();
            states.push(next);
        }
        assert_eq!(history.len(), 2);
        assert!(!history.contains(&states[1].accumulator));
        assert!(history.contains(&states[2].accumulator));
        assert_eq!(
            history
                .chain(&states[0].accumulator, &states[4].accumulator)
                .unwrap_err(),
            Error::UnknownAccumulatorState
        );
        assert_eq!(
            history
                .chain(&states[2].accumulator, &states[4].accumulator)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn repeated_values_use_the_closest_occurrence() {
        let (tails, s0) = setup(5);
        let (s1, d1) = s0.update(&btreeset! {1}, &btreeset! {}, &tails).unwrap();
        let (s2, d2) = s1.update(&btreeset! {2}, &btreeset! {}, &tails).unwrap();
        let (s3, d3) = s2.update(&btreeset! {}, &btreeset! {2}, &tails).unwrap();
        let (s4, d4) = s3.update(&btreeset! {3}, &btreeset! {}, &tails).unwrap();
        assert_eq!(s3.accumulator, s1.accumulator);
        let mut history = DeltaHistory::new(s0.accumulator, RetentionPolicy::unbounded());
        for d in [d1, d2, d3, d4] {
            history.publish(d).unwrap();
        }
        assert_eq!(history.range_between(&s1.accumulator, &s4.accumulator).unwrap(), 3..4);
        assert_eq!(history.range_between(&s1.accumulator, &s2.accumulator).unwrap(), 1..2);
    }
}

use super::{element::Element, key::PublicKey, key::SecretKey};
use crate::tails::{
    is_tails_position, tails_len, InMemoryTails, TailsEntry, TailsError, TailsSource,
};
use crate::{check_capacity, RevxResult};
use blsful::inner_types::{G2Projective, Scalar};
use log::debug;

/// Produces the tails of one registry from its secret.
///
/// Position `k` is `g2·γ^k`. As a [`TailsSource`] the generator computes
/// each requested entry on the fly.
#[derive(Clone, Debug)]
pub struct TailsGenerator {
    key: SecretKey,
    max_cred_num: u32,
}

impl TailsGenerator {
    /// Create a generator for a registry with `max_cred_num` entries
    pub fn new(key: SecretKey, max_cred_num: u32) -> RevxResult<Self> {
        check_capacity(max_cred_num)?;
        Ok(Self { key, max_cred_num })
    }

    /// The registry capacity
    pub fn max_cred_num(&self) -> u32 {
        self.max_cred_num
    }

    /// The verification key matching these tails
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(&self.key, self.max_cred_num)
    }

    /// Compute every published entry
    pub fn generate(&self) -> InMemoryTails<Element> {
        let total = tails_len(self.max_cred_num);
        debug!(
            "generating {} tails entries for capacity {}",
            total - 1,
            self.max_cred_num
        );
        let mut entries = Vec::with_capacity(total as usize - 1);
        let mut p = Scalar::ONE;
        for position in 1..=total {
            p *= self.key.0;
            if position != self.max_cred_num + 1 {
                entries.push(TailsEntry(Element(G2Projective::GENERATOR * p)));
            }
        }
        InMemoryTails::from_parts(self.max_cred_num, entries)
    }
}

impl TailsSource<Element> for TailsGenerator {
    fn fetch(&self, position: u32) -> Result<TailsEntry<Element>, TailsError> {
        if !is_tails_position(position, self.max_cred_num) {
            return Err(TailsError::NotFound(position));
        }
        Ok(TailsEntry(Element(
            G2Projective::GENERATOR * self.key.power(u64::from(position)),
        )))
    }

    fn max_cred_num(&self) -> u32 {
        self.max_cred_num
    }
}

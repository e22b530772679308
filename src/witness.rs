use crate::algebra::{AccumulatorElement, AccumulatorValue, Witness, WitnessVerifier};
use crate::error::Error;
use crate::registry::{check_chain, RegistryDelta, RegistryLedger};
use crate::tails::{check_tails, witness_position, TailsSource};
use crate::{check_capacity, check_index, RevocationIndex, RevxResult};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A witness together with the checkpoint it is valid for.
///
/// States are never modified in place: recomputation returns a new state
/// and the old one should be discarded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevocationState<E> {
    /// The credential's revocation index
    pub index: RevocationIndex,
    /// The registry capacity
    pub max_cred_num: u32,
    /// The witness for `index`
    pub witness: Witness<E>,
    /// The accumulator the witness is valid for
    pub accumulator: AccumulatorValue<E>,
}

impl<E: AccumulatorElement> RevocationState<E> {
    /// Compute the initial witness for `index`.
    ///
    /// `accumulator` must already accumulate `index` and `issued` are the
    /// currently accumulated indices, `index` included.
    pub fn new<T: TailsSource<E>>(
        index: RevocationIndex,
        max_cred_num: u32,
        accumulator: AccumulatorValue<E>,
        issued: &BTreeSet<RevocationIndex>,
        tails: &T,
    ) -> RevxResult<Self> {
        check_capacity(max_cred_num)?;
        check_index(index, max_cred_num)?;
        check_tails(tails, max_cred_num)?;
        if !issued.contains(&index) {
            return Err(Error::InvalidRegistryOperation("index is not accumulated"));
        }
        let mut omega = E::identity();
        for j in issued.iter().filter(|j| **j != index) {
            check_index(*j, max_cred_num)?;
            let tail = tails.fetch(witness_position(max_cred_num, index, *j))?;
            omega = omega.combine(&tail.0);
        }
        Ok(Self {
            index,
            max_cred_num,
            witness: Witness(omega),
            accumulator,
        })
    }

    /// Fold `deltas` into the witness and return the state valid for the
    /// accumulator the last delta ends at.
    ///
    /// The chain must start at this state's accumulator. An empty chain
    /// returns the same state.
    pub fn recompute<T: TailsSource<E>>(
        &self,
        deltas: &[RegistryDelta<E>],
        tails: &T,
    ) -> RevxResult<Self> {
        check_capacity(self.max_cred_num)?;
        check_index(self.index, self.max_cred_num)?;
        check_chain(&self.accumulator, deltas)?;
        // Checked before any tails access so revocation is never reported
        // as a fetch failure
        for d in deltas {
            d.validate()?;
            d.check_capacity(self.max_cred_num)?;
            if d.revoked.contains(&self.index) {
                return Err(Error::RevokedCredential(self.index));
            }
        }
        check_tails(tails, self.max_cred_num)?;

        let mut omega = self.witness.0;
        for d in deltas {
            trace!(
                "applying delta for index {}: issued {:?} revoked {:?}",
                self.index,
                d.issued,
                d.revoked
            );
            for j in d.issued.iter().filter(|j| **j != self.index) {
                let tail = tails.fetch(witness_position(self.max_cred_num, self.index, *j))?;
                omega = omega.combine(&tail.0);
            }
            for r in &d.revoked {
                let tail = tails.fetch(witness_position(self.max_cred_num, self.index, *r))?;
                omega = omega.combine(&tail.0.invert());
            }
        }

        let accumulator = deltas.last().map_or(self.accumulator, |d| d.to);
        Ok(Self {
            witness: Witness(omega),
            accumulator,
            ..*self
        })
    }

    /// Advance to `target` using the deltas published by `ledger`
    pub fn update_to<L, T>(
        &self,
        ledger: &L,
        target: &AccumulatorValue<E>,
        tails: &T,
    ) -> RevxResult<Self>
    where
        L: RegistryLedger<E> + ?Sized,
        T: TailsSource<E>,
    {
        if self.accumulator == *target {
            return Ok(*self);
        }
        let deltas = ledger.deltas_between(&self.accumulator, target)?;
        let next = self.recompute(&deltas, tails)?;
        if next.accumulator != *target {
            return Err(Error::InconsistentDelta("ledger chain misses the target"));
        }
        Ok(next)
    }

    /// Check the witness with a backend verifier
    pub fn verify<V: WitnessVerifier<E>>(&self, verifier: &V) -> bool {
        verifier.verify(self.index, &self.witness, &self.accumulator)
    }
}

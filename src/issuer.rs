use crate::algebra::{AccumulatorElement, AccumulatorValue};
use crate::binding::RevocationBinding;
use crate::error::Error;
use crate::registry::{
    DeltaHistory, IssuanceType, RegistryConfig, RegistryDelta, RegistryLedger, RegistryState,
};
use crate::tails::TailsSource;
use crate::witness::RevocationState;
use crate::{check_index, RevocationIndex, RevxResult};
use log::debug;
use std::collections::BTreeSet;

/// The owner of one revocation registry.
///
/// Holds the authoritative state and publishes a delta for every change.
#[derive(Clone, Debug)]
pub struct RegistryIssuer<E> {
    registry_id: String,
    config: RegistryConfig,
    state: RegistryState<E>,
    history: DeltaHistory<E>,
}

impl<E: AccumulatorElement> RegistryIssuer<E> {
    /// Create a new registry
    pub fn new<T: TailsSource<E>>(config: RegistryConfig, tails: &T) -> RevxResult<Self> {
        let state = RegistryState::new(&config, tails)?;
        let history = DeltaHistory::new(state.accumulator, config.retention);
        let registry_id = uuid::Uuid::new_v4().to_string();
        debug!(
            "created registry {} with capacity {} ({:?})",
            registry_id, config.max_cred_num, config.issuance_type
        );
        Ok(Self {
            registry_id,
            config,
            state,
            history,
        })
    }

    /// The registry identifier
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// The registry parameters
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The current registry state
    pub fn state(&self) -> &RegistryState<E> {
        &self.state
    }

    /// The published deltas
    pub fn history(&self) -> &DeltaHistory<E> {
        &self.history
    }

    /// The latest published accumulator
    pub fn accumulator(&self) -> &AccumulatorValue<E> {
        self.history.head()
    }

    /// Issue the credential at `index` and return its initial revocation state.
    ///
    /// On demand registries also return the published delta. Nothing is
    /// published unless the witness could be computed.
    pub fn issue<T: TailsSource<E>>(
        &mut self,
        index: RevocationIndex,
        tails: &T,
    ) -> RevxResult<(RevocationState<E>, Option<RegistryDelta<E>>)> {
        check_index(index, self.config.max_cred_num)?;
        if self.state.revoked.contains(&index) {
            return Err(Error::InvalidRegistryOperation("index was revoked"));
        }
        match self.config.issuance_type {
            IssuanceType::OnDemand => {
                let issued = BTreeSet::from([index]);
                let (next, delta) = self.state.update(&issued, &BTreeSet::new(), tails)?;
                let state = Self::initial_state(&next, index, tails)?;
                self.commit(next, delta.clone())?;
                debug!("registry {}: issued index {}", self.registry_id, index);
                Ok((state, Some(delta)))
            }
            IssuanceType::ByDefault => {
                let state = self.witness_for(index, tails)?;
                debug!("registry {}: issued index {}", self.registry_id, index);
                Ok((state, None))
            }
        }
    }

    /// Revoke every index in `indices` with a single delta
    pub fn revoke<T: TailsSource<E>>(
        &mut self,
        indices: &[RevocationIndex],
        tails: &T,
    ) -> RevxResult<RegistryDelta<E>> {
        let revoked: BTreeSet<_> = indices.iter().copied().collect();
        let (next, delta) = self.state.update(&BTreeSet::new(), &revoked, tails)?;
        self.commit(next, delta.clone())?;
        debug!("registry {}: revoked {:?}", self.registry_id, revoked);
        Ok(delta)
    }

    /// A fresh revocation state for an issued index at the current head
    pub fn witness_for<T: TailsSource<E>>(
        &self,
        index: RevocationIndex,
        tails: &T,
    ) -> RevxResult<RevocationState<E>> {
        Self::initial_state(&self.state, index, tails)
    }

    /// The binding to attach for `state`
    pub fn binding_for(&self, state: &RevocationState<E>) -> RevocationBinding<E> {
        RevocationBinding::revocable(self.registry_id.clone(), state)
    }

    fn initial_state<T: TailsSource<E>>(
        registry: &RegistryState<E>,
        index: RevocationIndex,
        tails: &T,
    ) -> RevxResult<RevocationState<E>> {
        check_index(index, registry.max_cred_num)?;
        if !registry.issued.contains(&index) {
            return Err(Error::InvalidRegistryOperation("index is not issued"));
        }
        RevocationState::new(
            index,
            registry.max_cred_num,
            registry.accumulator,
            &registry.issued,
            tails,
        )
    }

    fn commit(&mut self, next: RegistryState<E>, delta: RegistryDelta<E>) -> RevxResult<()> {
        self.history.publish(delta)?;
        self.state = next;
        Ok(())
    }
}

impl<E: AccumulatorElement> RegistryLedger<E> for RegistryIssuer<E> {
    fn deltas_between(
        &self,
        from: &AccumulatorValue<E>,
        to: &AccumulatorValue<E>,
    ) -> RevxResult<Vec<RegistryDelta<E>>> {
        self.history.deltas_between(from, to)
    }
}

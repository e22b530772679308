use crate::algebra::{AccumulatorElement, AccumulatorValue, Witness};
use crate::error::Error;
use crate::witness::RevocationState;
use crate::RevxResult;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// The revocation data attached to a credential or presentation
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevocationBinding<E> {
    /// The credential definition is revocable
    Revocable {
        /// The non-revocation witness
        witness: Witness<E>,
        /// The registry the witness belongs to
        registry_id: String,
        /// The accumulator the witness is valid for
        registry_ref: AccumulatorValue<E>,
    },
    /// The credential definition is not revocable
    NonRevocable,
}

impl<E: AccumulatorElement> RevocationBinding<E> {
    /// Bind a revocation state of registry `registry_id`
    pub fn revocable(registry_id: impl Into<String>, state: &RevocationState<E>) -> Self {
        Self::Revocable {
            witness: state.witness,
            registry_id: registry_id.into(),
            registry_ref: state.accumulator,
        }
    }

    /// True for the revocable variant
    pub fn is_revocable(&self) -> bool {
        matches!(self, Self::Revocable { .. })
    }

    /// Check the binding against the credential definition
    pub fn validate(&self, revocable: bool) -> RevxResult<()> {
        match (self, revocable) {
            (Self::Revocable { .. }, false) => Err(Error::UnexpectedWitness),
            (Self::NonRevocable, true) => Err(Error::MissingWitness),
            _ => Ok(()),
        }
    }

    /// The wire form of this binding
    pub fn to_wire(&self) -> RevocationBindingData<E> {
        RevocationBindingData::from(self)
    }
}

impl<E: AccumulatorElement + Serialize> RevocationBinding<E> {
    /// Validate and encode for transmission
    pub fn to_wire_bytes(&self, revocable: bool) -> RevxResult<Vec<u8>> {
        self.validate(revocable)?;
        self.to_wire().to_bytes()
    }
}

/// The wire form of a [`RevocationBinding`].
///
/// Absent fields are explicit `None`s. A value is only usable after
/// [`RevocationBindingData::into_binding`] checked it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevocationBindingData<E> {
    /// The non-revocation witness
    pub witness: Option<Witness<E>>,
    /// The registry identifier
    pub registry_id: Option<String>,
    /// The accumulator the witness is valid for
    pub registry_state_ref: Option<AccumulatorValue<E>>,
}

impl<E> Default for RevocationBindingData<E> {
    fn default() -> Self {
        Self {
            witness: None,
            registry_id: None,
            registry_state_ref: None,
        }
    }
}

impl<E: AccumulatorElement> RevocationBindingData<E> {
    /// All fields present for revocable credentials, none otherwise.
    ///
    /// Partial payloads are always rejected.
    pub fn validate(&self, revocable: bool) -> RevxResult<()> {
        let present = [
            self.witness.is_some(),
            self.registry_id.is_some(),
            self.registry_state_ref.is_some(),
        ];
        if revocable {
            if present.iter().all(|p| *p) {
                Ok(())
            } else {
                Err(Error::MissingWitness)
            }
        } else if present.iter().any(|p| *p) {
            Err(Error::UnexpectedWitness)
        } else {
            Ok(())
        }
    }

    /// Validate and convert into a binding
    pub fn into_binding(self, revocable: bool) -> RevxResult<RevocationBinding<E>> {
        self.validate(revocable)?;
        match (self.witness, self.registry_id, self.registry_state_ref) {
            (Some(witness), Some(registry_id), Some(registry_ref)) => {
                Ok(RevocationBinding::Revocable {
                    witness,
                    registry_id,
                    registry_ref,
                })
            }
            _ => Ok(RevocationBinding::NonRevocable),
        }
    }
}

impl<E: AccumulatorElement + Serialize> RevocationBindingData<E> {
    /// Encode with serde_bare
    pub fn to_bytes(&self) -> RevxResult<Vec<u8>> {
        serde_bare::to_vec(self).map_err(|_| Error::InvalidWireData("unable to encode binding"))
    }
}

impl<E: AccumulatorElement + DeserializeOwned> RevocationBindingData<E> {
    /// Decode from serde_bare bytes
    pub fn from_bytes(bytes: &[u8]) -> RevxResult<Self> {
        serde_bare::from_slice(bytes).map_err(|_| Error::InvalidWireData("unable to decode binding"))
    }
}

impl<E: AccumulatorElement> From<&RevocationBinding<E>> for RevocationBindingData<E> {
    fn from(binding: &RevocationBinding<E>) -> Self {
        match binding {
            RevocationBinding::Revocable {
                witness,
                registry_id,
                registry_ref,
            } => Self {
                witness: Some(*witness),
                registry_id: Some(registry_id.clone()),
                registry_state_ref: Some(*registry_ref),
            },
            RevocationBinding::NonRevocable => Self::default(),
        }
    }
}

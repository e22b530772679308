use crate::tails::TailsError;
use core::fmt::{self, Display, Formatter};

/// Errors created by this library
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The credential is revocable but the binding lacks a field
    MissingWitness,
    /// The credential is not revocable but the binding carries a field
    UnexpectedWitness,
    /// The revocation index is outside the registry
    CapacityExceeded {
        /// The offending index
        index: u32,
        /// The registry capacity
        max_cred_num: u32,
    },
    /// A tails entry could not be fetched after all retries
    TailsFetch(u32),
    /// A tails position that does not exist was requested
    TailsNotFound(u32),
    /// The credential's own index was revoked
    RevokedCredential(u32),
    /// The deltas do not form a chain
    InconsistentDelta(&'static str),
    /// The accumulator value is not in the retained history
    UnknownAccumulatorState,
    /// The registry owner asked for an impossible update
    InvalidRegistryOperation(&'static str),
    /// A wire payload could not be decoded
    InvalidWireData(&'static str),
}

impl Error {
    /// True when retrying with other inputs can never succeed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RevokedCredential(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingWitness => write!(f, "revocable credential is missing its witness"),
            Self::UnexpectedWitness => {
                write!(f, "non-revocable credential carries revocation data")
            }
            Self::CapacityExceeded {
                index,
                max_cred_num,
            } => write!(
                f,
                "revocation index {} is outside the registry capacity {}",
                index, max_cred_num
            ),
            Self::TailsFetch(i) => write!(f, "unable to fetch tails entry {}", i),
            Self::TailsNotFound(i) => write!(f, "tails entry {} does not exist", i),
            Self::RevokedCredential(i) => write!(f, "credential {} is revoked", i),
            Self::InconsistentDelta(s) => write!(f, "inconsistent registry delta: {}", s),
            Self::UnknownAccumulatorState => {
                write!(f, "accumulator state is not in the registry history")
            }
            Self::InvalidRegistryOperation(s) => write!(f, "invalid registry operation: {}", s),
            Self::InvalidWireData(s) => write!(f, "invalid wire data: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<TailsError> for Error {
    fn from(e: TailsError) -> Self {
        match e {
            TailsError::Unavailable(i) => Self::TailsFetch(i),
            TailsError::NotFound(i) => Self::TailsNotFound(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_revocation_is_terminal() {
        assert!(Error::RevokedCredential(3).is_terminal());
        assert!(!Error::TailsFetch(3).is_terminal());
        assert!(!Error::UnknownAccumulatorState.is_terminal());
    }

    #[test]
    fn tails_errors_keep_their_kind() {
        assert_eq!(Error::from(TailsError::Unavailable(4)), Error::TailsFetch(4));
        assert_eq!(Error::from(TailsError::NotFound(6)), Error::TailsNotFound(6));
    }
}

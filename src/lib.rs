//! Revocation witnesses for accumulator based anonymous credentials.
//!
//! An issuer hands out a witness with every revocable credential. The
//! witness proves that the credential's revocation index is accumulated in
//! a specific accumulator value. As the registry evolves the holder folds
//! the published deltas into the witness instead of asking the issuer for
//! a new one.
#![warn(missing_docs)]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// The accumulator algebra capability interface
pub mod algebra;
/// Credential and presentation revocation bindings
pub mod binding;
/// Errors created by this library
pub mod error;
/// Registry owner operations
pub mod issuer;
/// Cryptographic backends
pub mod knox;
/// Registry state and delta history
pub mod registry;
/// Tails sources
pub mod tails;
/// Witness initialization and recomputation
pub mod witness;

pub use error::Error;

/// Result type for this crate
pub type RevxResult<T> = Result<T, Error>;

/// Commonly used types
pub mod prelude {
    pub use super::algebra::*;
    pub use super::binding::*;
    pub use super::error::*;
    pub use super::issuer::*;
    pub use super::knox::accumulator::cks09;
    pub use super::registry::*;
    pub use super::tails::*;
    pub use super::witness::*;
    pub use super::RevxResult;
}

/// A revocation index inside a registry, `1..=max_cred_num`
pub type RevocationIndex = u32;

/// Check that `index` is addressable in a registry of `max_cred_num` entries
pub fn check_index(index: RevocationIndex, max_cred_num: u32) -> RevxResult<()> {
    if index == 0 || index > max_cred_num {
        return Err(Error::CapacityExceeded {
            index,
            max_cred_num,
        });
    }
    Ok(())
}

/// Check that a registry of `max_cred_num` entries is addressable
pub fn check_capacity(max_cred_num: u32) -> RevxResult<()> {
    if max_cred_num == 0 || max_cred_num > registry::MAX_CAPACITY {
        return Err(Error::InvalidRegistryOperation(
            "registry capacity is out of range",
        ));
    }
    Ok(())
}

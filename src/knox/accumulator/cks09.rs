//! The accumulator from Camenisch, Kohlweiss and Soriente 2009
//! <https://eprint.iacr.org/2008/539.pdf>
//!
//! Index `j` of a registry with `L` entries is accumulated by adding tails
//! position `L+1-j` which is `g2·γ^(L+1-j)`. The witness for index `i`
//! is the sum of positions `L+1-j+i` over every other accumulated `j`.
//! Position `L+1` is never published so a witness cannot be produced for
//! an index that is not accumulated.

/// Accumulator elements
mod element;
/// Accumulator errors
mod error;
/// Secret and verification keys
mod key;
/// Tails generation
mod tails;

pub use element::*;
pub use error::*;
pub use key::*;
pub use tails::*;

use blsful::inner_types::Scalar;
use rand_core::{CryptoRng, RngCore};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake256,
};

/// Similar to https://tools.ietf.org/html/draft-irtf-cfrg-bls-signature-04#section-2.3
/// info is left blank
fn generate_fr(salt: &[u8], ikm: Option<&[u8]>, mut rng: impl RngCore + CryptoRng) -> Scalar {
    let mut hasher = Shake256::default();
    match ikm {
        Some(v) => {
            hasher.update(salt);
            hasher.update(v);
        }
        None => {
            hasher.update(salt);
            let mut arr = [0u8; 32];
            rng.fill_bytes(&mut arr);
            hasher.update(&arr);
        }
    };
    let mut okm = [0u8; 64];
    let mut xof = hasher.finalize_xof();
    xof.read(&mut okm);
    Scalar::from_bytes_wide(&okm)
}

/// base^exp by square and multiply
fn scalar_pow(base: Scalar, mut exp: u64) -> Scalar {
    let mut res = Scalar::ONE;
    let mut b = base;
    while exp > 0 {
        if exp & 1 == 1 {
            res *= b;
        }
        b = b * b;
        exp >>= 1;
    }
    res
}

/// Salt used when deriving registry keys
/// Camenisch Kohlweiss Soriente = CKS
const KEYGEN_SALT: &[u8] = b"CKS-ACC-KEYGEN-SALT-";

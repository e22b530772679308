use super::{element::Element, error::Error, generate_fr, scalar_pow, KEYGEN_SALT};
use crate::algebra::{AccumulatorValue, Witness, WitnessVerifier};
use crate::RevocationIndex;
use blsful::inner_types::{
    Curve, multi_miller_loop, pairing, G1Projective, G2Affine, G2Prepared, Gt, Scalar,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Represents γ, the registry trapdoor used to generate tails
#[derive(Clone, Debug, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
pub struct SecretKey(pub Scalar);

impl From<Scalar> for SecretKey {
    fn from(s: Scalar) -> Self {
        Self(s)
    }
}

impl TryFrom<&[u8; 32]> for SecretKey {
    type Error = Error;

    fn try_from(bytes: &[u8; 32]) -> Result<Self, Self::Error> {
        Option::<Scalar>::from(Scalar::from_le_bytes(bytes))
            .map(Self)
            .ok_or_else(|| Error::from_msg(1, "invalid byte sequence"))
    }
}

impl SecretKey {
    const BYTES: usize = 32;

    /// Create a new secret key
    pub fn new(seed: Option<&[u8]>) -> Self {
        Self(generate_fr(KEYGEN_SALT, seed, rand_core::OsRng))
    }

    /// Return the raw byte representation of the key
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        self.0.to_le_bytes()
    }

    /// γ^k
    pub(crate) fn power(&self, k: u64) -> Scalar {
        scalar_pow(self.0, k)
    }
}

/// The public values needed to check witnesses of one registry.
///
/// `z = e(g1, g2)^(γ^(L+1))` and `index_points[i-1] = g1·γ^i`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicKey {
    /// The pairing of the unpublished tails position
    pub z: Gt,
    /// One G1 point per revocation index
    pub index_points: Vec<G1Projective>,
}

impl PublicKey {
    /// Derive the verification key for a registry with `max_cred_num` entries
    pub fn new(key: &SecretKey, max_cred_num: u32) -> Self {
        let mut index_points = Vec::with_capacity(max_cred_num as usize);
        let mut p = Scalar::ONE;
        for _ in 0..max_cred_num {
            p *= key.0;
            index_points.push(G1Projective::GENERATOR * p);
        }
        p *= key.0;
        let z = pairing(
            &(G1Projective::GENERATOR * p).to_affine(),
            &G2Affine::generator(),
        );
        Self { z, index_points }
    }

    /// The registry capacity this key covers
    pub fn max_cred_num(&self) -> u32 {
        self.index_points.len() as u32
    }

    /// g1·γ^index
    pub fn index_point(&self, index: RevocationIndex) -> Option<G1Projective> {
        if index == 0 {
            return None;
        }
        self.index_points.get(index as usize - 1).copied()
    }
}

impl WitnessVerifier<Element> for PublicKey {
    /// e(g1·γ^i, V) == e(g1, ω)·z
    fn verify(
        &self,
        index: RevocationIndex,
        witness: &Witness<Element>,
        accumulator: &AccumulatorValue<Element>,
    ) -> bool {
        let Some(point) = self.index_point(index) else {
            return false;
        };
        let g1 = -G1Projective::GENERATOR;
        multi_miller_loop(&[
            (
                &point.to_affine(),
                &G2Prepared::from(accumulator.0 .0.to_affine()),
            ),
            (&g1.to_affine(), &G2Prepared::from(witness.0 .0.to_affine())),
        ])
        .final_exponentiation()
            == self.z
    }
}

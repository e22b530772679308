use super::error::Error;
use crate::algebra::AccumulatorElement;
use blsful::inner_types::{GroupEncoding, G2Affine, G2Projective};
use serde::{Deserialize, Serialize};

/// A G2 point used for accumulator values, witnesses and tails entries
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Element(pub G2Projective);

impl core::fmt::Display for Element {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Element {{ {} }}", self.0)
    }
}

impl From<Element> for G2Projective {
    fn from(e: Element) -> Self {
        e.0
    }
}

impl From<G2Projective> for Element {
    fn from(g: G2Projective) -> Self {
        Self(g)
    }
}

impl TryFrom<&[u8; 96]> for Element {
    type Error = Error;

    fn try_from(value: &[u8; 96]) -> Result<Self, Self::Error> {
        Option::<G2Affine>::from(G2Affine::from_compressed(value))
            .map(|pt| Self(G2Projective::from(pt)))
            .ok_or_else(|| Error::from_msg(1, "incorrect byte sequence"))
    }
}

impl Element {
    /// The number of bytes in a compressed element
    pub const BYTES: usize = 96;

    /// The compressed byte representation
    pub fn to_compressed(&self) -> [u8; Self::BYTES] {
        let mut d = [0u8; Self::BYTES];
        d.copy_from_slice(self.0.to_bytes().as_ref());
        d
    }
}

impl AccumulatorElement for Element {
    fn identity() -> Self {
        Self(G2Projective::IDENTITY)
    }

    fn combine(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    fn invert(&self) -> Self {
        Self(-self.0)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.to_compressed().to_vec()
    }
}

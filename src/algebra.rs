use crate::RevocationIndex;
use core::fmt::{self, Debug, Display, Formatter};
use serde::{Deserialize, Serialize};

/// Group operations the witness logic needs from a cryptographic backend.
///
/// The group is written additively: `combine` adds, `invert` negates and
/// `identity` is the neutral element. `combine` must be commutative.
pub trait AccumulatorElement: Copy + Debug + Eq + Send + Sync + 'static {
    /// The neutral element
    fn identity() -> Self;

    /// Combine two elements
    fn combine(&self, other: &Self) -> Self;

    /// The inverse of this element
    fn invert(&self) -> Self;

    /// Canonical byte encoding, equal elements have equal bytes
    fn to_bytes(&self) -> Vec<u8>;

    /// Is this the neutral element
    fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Checks a witness against an accumulator value
pub trait WitnessVerifier<E: AccumulatorElement> {
    /// True if `witness` proves `index` is accumulated in `accumulator`
    fn verify(
        &self,
        index: RevocationIndex,
        witness: &Witness<E>,
        accumulator: &AccumulatorValue<E>,
    ) -> bool;
}

/// The aggregate value of a registry at one checkpoint
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorValue<E>(pub E);

/// Evidence that an index is accumulated in one accumulator value
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Witness<E>(pub E);

macro_rules! element_wrapper_impl {
    ($name:ident) => {
        impl<E: AccumulatorElement> $name<E> {
            /// Wraps the neutral element
            pub fn identity() -> Self {
                Self(E::identity())
            }

            /// Canonical byte encoding
            pub fn to_bytes(&self) -> Vec<u8> {
                self.0.to_bytes()
            }
        }

        impl<E: AccumulatorElement> Display for $name<E> {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($name), " {{ {} }}"),
                    hex::encode(self.0.to_bytes())
                )
            }
        }
    };
}

element_wrapper_impl!(AccumulatorValue);
element_wrapper_impl!(Witness);

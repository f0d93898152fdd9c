//! The `(v, r, s)` signature triple attached to transactions.

use alloy_primitives::{U256, U64};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use arbitrary::{Arbitrary, Unstructured};
use serde::{Deserialize, Serialize};

/// A recoverable ECDSA signature in the form the chain and the custodial service exchange it.
///
/// Equality is structural: two signatures are the same if all three components match. This is
/// what duplicate suppression relies on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct SignatureData {
    /// Recovery id, including the chain id offset.
    #[serde(rename = "V")]
    pub v: U64,

    /// The `r` component.
    #[serde(rename = "R")]
    pub r: U256,

    /// The `s` component.
    #[serde(rename = "S")]
    pub s: U256,
}

impl SignatureData {
    /// Create a new [`SignatureData`].
    pub fn new(v: u64, r: U256, s: U256) -> Self {
        Self {
            v: U64::from(v),
            r,
            s,
        }
    }

    /// The placeholder signature used when a transaction has not been signed yet.
    pub fn empty() -> Self {
        Self::new(1, U256::ZERO, U256::ZERO)
    }

    /// Whether this is a placeholder rather than an actual signature.
    pub fn is_empty(&self) -> bool {
        self.r.is_zero() && self.s.is_zero()
    }
}

impl Default for SignatureData {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> Arbitrary<'a> for SignatureData {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let v = u64::arbitrary(u)?;
        let r = <[u8; 32]>::arbitrary(u)?;
        let s = <[u8; 32]>::arbitrary(u)?;

        Ok(Self::new(
            v,
            U256::from_be_bytes(r),
            U256::from_be_bytes(s),
        ))
    }
}

//! BN254 scalar field element, the target of `BallotHasher` and the public
//! input type consumed by `ProofAdapter`.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single element of the BN254 scalar field, stored canonically as
/// 32 big-endian bytes. Mirrors the teacher's `pubkey_to_field`/
/// `u64_to_field` convention (`helpers/field.rs`) but generalized to a
/// real field type backed by `ark_ff` instead of hand-rolled modular
/// subtraction, since this runs off-chain with no syscall budget.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub const BYTE_LEN: usize = 32;

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// Reduce 32 big-endian bytes modulo the field order.
    pub fn from_bytes_be_mod(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Parse 32 big-endian bytes as a canonical field element.
    ///
    /// Returns `None` if `bytes` does not encode a value strictly less
    /// than the field modulus (a non-canonical encoding must be rejected,
    /// not silently reduced, when it arrives as an already-hashed value
    /// from the wire).
    pub fn from_canonical_be(bytes: &[u8; 32]) -> Option<Self> {
        let reduced = Fr::from_be_bytes_mod_order(bytes);
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&reduced.into_bigint().to_bytes_be());
        while buf.len() < 32 {
            buf.insert(0, 0);
        }
        if buf == bytes {
            Some(Self(reduced))
        } else {
            None
        }
    }

    pub fn to_bytes_be(self) -> [u8; 32] {
        let be = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - be.len()..].copy_from_slice(&be);
        out
    }

    pub fn inner(self) -> Fr {
        self.0
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement(0x{})", hex::encode(self.to_bytes_be()))
    }
}

/// Rendered as a decimal string, not hex — `spec.md` §6 reserves hex for
/// opaque byte buffers and calls for BigInt values (this is a BN254 scalar,
/// not machine-integer-sized) as plain decimal strings.
impl Serialize for FieldElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = BigUint::from_bytes_be(&self.to_bytes_be());
        serializer.serialize_str(&value.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value: BigUint = raw.parse().map_err(serde::de::Error::custom)?;
        let be = value.to_bytes_be();
        if be.len() > 32 {
            return Err(serde::de::Error::custom("value does not fit in 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr[32 - be.len()..].copy_from_slice(&be);
        Self::from_canonical_be(&arr)
            .ok_or_else(|| serde::de::Error::custom("value is not a canonical field element"))
    }
}

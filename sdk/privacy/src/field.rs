//! Field Encoding
//!
//! Every 256-bit value in the pool is a big-endian unsigned integer that must
//! be a canonical BN254 scalar. Values at or above the modulus are rejected
//! rather than reduced: accepting `x` and `x + r` as distinct inputs would let
//! the same public signal be spelled two ways.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FieldError;

/// Convert a field element to 32 bytes (big-endian)
pub fn field_to_bytes(f: Fr) -> [u8; 32] {
    let bytes = f.into_bigint().to_bytes_be();
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    arr
}

/// Parse 32 big-endian bytes as a canonical field element
pub fn bytes_to_field(bytes: &[u8; 32]) -> Result<Fr, FieldError> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    if field_to_bytes(f) == *bytes {
        Ok(f)
    } else {
        Err(FieldError::NotInField(format!("0x{}", hex::encode(bytes))))
    }
}

/// A 160-bit principal (depositor, recipient, relayer, ledger account)
///
/// Addresses embed injectively into the field as `uint160`, so a proof bound
/// to one recipient can never be replayed for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose low 8 bytes hold `n` (handy for fixtures)
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// The address as a field element (`uint160` big-endian)
    pub fn to_field(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

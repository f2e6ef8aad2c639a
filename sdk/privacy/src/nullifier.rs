//! Nullifier Hashes
//!
//! ```text
//! NullifierHash = Poseidon(nullifier)
//! ```
//!
//! The hash is published when a note is claimed. Once recorded as spent, the
//! corresponding note can never be claimed again, whichever path claims it.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FieldError;
use crate::field::{bytes_to_field, field_to_bytes};

/// A nullifier hash (32 bytes) - unique tag for a claimed note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NullifierHash(pub [u8; 32]);

impl NullifierHash {
    /// Create from field element
    pub fn from_field(f: Fr) -> Self {
        Self(field_to_bytes(f))
    }

    /// Convert to field element, rejecting non-canonical encodings
    pub fn to_field(&self) -> Result<Fr, FieldError> {
        bytes_to_field(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for NullifierHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for NullifierHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

//! Note Commitments
//!
//! A commitment is the public leaf that binds a secret note to the tree.
//!
//! ```text
//! Commitment = Poseidon(nullifier, secret)
//! ```

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FieldError;
use crate::field::{bytes_to_field, field_to_bytes};

/// A note commitment (32 bytes, big-endian field element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Create commitment from field element
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
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

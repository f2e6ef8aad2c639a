//! Opaque handles
//!
//! A handle names a ciphertext held by the backend. The all-zero handle means
//! "never initialized", matching an account that has no balance yet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to an encrypted unsigned 64-bit amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OpaqueAmount(pub [u8; 32]);

impl OpaqueAmount {
    pub const UNINITIALIZED: Self = Self([0u8; 32]);

    pub fn is_initialized(&self) -> bool {
        *self != Self::UNINITIALIZED
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OpaqueAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Handle to an encrypted boolean (comparison result)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EncryptedBool(pub [u8; 32]);

impl fmt::Display for EncryptedBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

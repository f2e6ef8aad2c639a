//! Public disclosure of opaque amounts
//!
//! Once a handle is marked publicly decryptable, anyone can ask the
//! decryption oracle for `(clear_bytes, proof)`. The pool accepts the
//! cleartext only if the proof attests it is the decryption of that exact
//! handle.
//!
//! Wire format of the cleartext: 32-byte big-endian unsigned integer; the
//! amount lives in the low 8 bytes.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{DisclosureError, LedgerError};
use crate::handle::OpaqueAmount;

/// Length of an encoded clear amount
pub const CLEAR_AMOUNT_LEN: usize = 32;

/// Domain separation for oracle attestations
const DISCLOSURE_DOMAIN: &[u8] = b"cipherpool-disclosure-v1";

/// Oracle attestation over `(handle, clear_bytes)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureProof(pub Vec<u8>);

/// A decrypted handle together with its attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedAmount {
    pub handle: OpaqueAmount,
    pub clear_bytes: Vec<u8>,
    pub proof: DisclosureProof,
}

/// Produces verifiable decryptions of publicly decryptable handles
pub trait DecryptionOracle {
    fn public_decrypt(&self, handle: &OpaqueAmount) -> Result<DisclosedAmount, LedgerError>;
}

/// Checks a decryption attestation
pub trait DisclosureVerifier {
    fn verify(&self, handle: &OpaqueAmount, clear_bytes: &[u8], proof: &DisclosureProof) -> bool;
}

/// Message signed by the oracle
pub(crate) fn disclosure_message(handle: &OpaqueAmount, clear_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DISCLOSURE_DOMAIN);
    hasher.update(handle.as_bytes());
    hasher.update(&(clear_bytes.len() as u64).to_be_bytes());
    hasher.update(clear_bytes);
    *hasher.finalize().as_bytes()
}

/// Verifies attestations signed by an ed25519 oracle key
#[derive(Debug, Clone)]
pub struct Ed25519DisclosureVerifier {
    oracle_key: VerifyingKey,
}

impl Ed25519DisclosureVerifier {
    pub fn new(oracle_key: VerifyingKey) -> Self {
        Self { oracle_key }
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, DisclosureError> {
        let oracle_key =
            VerifyingKey::from_bytes(bytes).map_err(|_| DisclosureError::InvalidOracleKey)?;
        Ok(Self { oracle_key })
    }
}

impl DisclosureVerifier for Ed25519DisclosureVerifier {
    fn verify(&self, handle: &OpaqueAmount, clear_bytes: &[u8], proof: &DisclosureProof) -> bool {
        let Ok(signature) = Signature::from_slice(&proof.0) else {
            return false;
        };
        let message = disclosure_message(handle, clear_bytes);
        self.oracle_key.verify(&message, &signature).is_ok()
    }
}

/// Encode an amount in the cleartext wire format
pub fn encode_clear_amount(value: u64) -> [u8; CLEAR_AMOUNT_LEN] {
    let mut bytes = [0u8; CLEAR_AMOUNT_LEN];
    bytes[CLEAR_AMOUNT_LEN - 8..].copy_from_slice(&value.to_be_bytes());
    bytes
}

/// Decode a cleartext amount
pub fn decode_clear_amount(bytes: &[u8]) -> Result<u64, DisclosureError> {
    if bytes.len() != CLEAR_AMOUNT_LEN {
        return Err(DisclosureError::MalformedAmount(format!(
            "expected {} bytes, got {}",
            CLEAR_AMOUNT_LEN,
            bytes.len()
        )));
    }
    let (high, low) = bytes.split_at(CLEAR_AMOUNT_LEN - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(DisclosureError::MalformedAmount(
            "value does not fit in 64 bits".into(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

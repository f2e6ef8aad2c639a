//! Claim Proofs
//!
//! A claim (wrap or withdraw) carries a Groth16 proof over BN254 that the
//! caller knows the opening of some commitment in the tree.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Public Signals (order is fixed)           │
//! │                                                              │
//! │   [0] root            recent membership root                 │
//! │   [1] recipient       uint160 address as field element       │
//! │   [2] nullifier_hash  marks the note spent                   │
//! │   [3] relayer         uint160 address as field element       │
//! │   [4] fee             paid to the relayer                    │
//! │   [5] refund          passed through to the recipient        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Verifying against a permuted vector fails; [`PublicSignals::new`] is the
//! only way to build one.

use anyhow::{Context, Result};
use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_groth16::{Groth16, PreparedVerifyingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_snark::SNARK;
use serde::{Deserialize, Serialize};
use std::path::Path;

use cipherpool_privacy::{Address, FieldError, MerkleRoot, NullifierHash};

/// Number of public signals of a claim proof
pub const PUBLIC_SIGNALS: usize = 6;

/// Groth16 proof as compressed curve points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// G1, 32 bytes compressed
    #[serde(with = "hex")]
    pub a: Vec<u8>,
    /// G2, 64 bytes compressed
    #[serde(with = "hex")]
    pub b: Vec<u8>,
    /// G1, 32 bytes compressed
    #[serde(with = "hex")]
    pub c: Vec<u8>,
}

impl Proof {
    /// Compress an arkworks proof
    pub fn from_groth16(proof: &ark_groth16::Proof<Bn254>) -> Result<Self, SerializationError> {
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut c = Vec::new();
        proof.a.serialize_compressed(&mut a)?;
        proof.b.serialize_compressed(&mut b)?;
        proof.c.serialize_compressed(&mut c)?;
        Ok(Self { a, b, c })
    }

    /// Decompress into an arkworks proof; `None` if any point is invalid
    pub fn to_groth16(&self) -> Option<ark_groth16::Proof<Bn254>> {
        Some(ark_groth16::Proof {
            a: G1Affine::deserialize_compressed(self.a.as_slice()).ok()?,
            b: G2Affine::deserialize_compressed(self.b.as_slice()).ok()?,
            c: G1Affine::deserialize_compressed(self.c.as_slice()).ok()?,
        })
    }
}

/// The six public inputs of a claim proof, in circuit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicSignals([Fr; PUBLIC_SIGNALS]);

impl PublicSignals {
    pub fn new(
        root: &MerkleRoot,
        recipient: &Address,
        nullifier_hash: &NullifierHash,
        relayer: &Address,
        fee: u64,
        refund: u64,
    ) -> Result<Self, FieldError> {
        Ok(Self([
            root.to_field()?,
            recipient.to_field(),
            nullifier_hash.to_field()?,
            relayer.to_field(),
            Fr::from(fee),
            Fr::from(refund),
        ]))
    }

    pub fn as_fields(&self) -> &[Fr; PUBLIC_SIGNALS] {
        &self.0
    }
}

/// Decides whether a proof is valid for the given public signals
///
/// Must be deterministic and free of side effects.
pub trait ProofVerifier {
    fn verify(&self, proof: &Proof, signals: &PublicSignals) -> bool;
}

impl<F> ProofVerifier for F
where
    F: Fn(&Proof, &PublicSignals) -> bool,
{
    fn verify(&self, proof: &Proof, signals: &PublicSignals) -> bool {
        self(proof, signals)
    }
}

// ============================================================================
// Groth16 Verifier
// ============================================================================

/// Groth16 verifier over BN254 using arkworks
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
    /// Hash of the compressed verifying key
    vk_hash: [u8; 32],
}

impl Groth16Verifier {
    pub fn new(vk: &VerifyingKey<Bn254>) -> Result<Self> {
        if vk.gamma_abc_g1.len() != PUBLIC_SIGNALS + 1 {
            anyhow::bail!(
                "verifying key expects {} public inputs, claims have {}",
                vk.gamma_abc_g1.len().saturating_sub(1),
                PUBLIC_SIGNALS
            );
        }
        let pvk = Groth16::<Bn254>::process_vk(vk)
            .map_err(|e| anyhow::anyhow!("Failed to prepare verifying key: {}", e))?;

        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to serialize VK: {}", e))?;

        Ok(Self {
            pvk,
            vk_hash: *blake3::hash(&vk_bytes).as_bytes(),
        })
    }

    /// Build from a compressed arkworks verifying key
    pub fn from_bytes(vk_bytes: &[u8]) -> Result<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to deserialize verifying key: {}", e))?;
        Self::new(&vk)
    }

    /// Load a compressed verifying key from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let vk_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read verifying key from {}", path.display()))?;
        let verifier = Self::from_bytes(&vk_bytes)?;
        log::info!("Loaded claim verifying key from {}", path.display());
        Ok(verifier)
    }

    pub fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &Proof, signals: &PublicSignals) -> bool {
        let Some(proof) = proof.to_groth16() else {
            return false;
        };
        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, signals.as_fields(), &proof)
            .unwrap_or(false)
    }
}

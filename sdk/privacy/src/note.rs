//! Shielded Notes
//!
//! A note is the depositor's secret. Only its commitment goes on-pool; the
//! nullifier hash is revealed later, when the note is claimed.
//!
//! ```text
//! Note = {
//!     nullifier: Fr,   // revealed as Poseidon(NULL_DOMAIN, nullifier)
//!     secret: Fr,      // never revealed
//! }
//! ```

use ark_bn254::Fr;
use ark_ff::UniformRand;
use ark_std::rand::Rng;

use crate::commitment::Commitment;
use crate::merkle::poseidon_hash;
use crate::nullifier::NullifierHash;

/// Domain separation for nullifier hashing ("NULL")
const NULLIFIER_DOMAIN: u64 = 0x4e554c4c;

/// A shielded note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub nullifier: Fr,
    pub secret: Fr,
}

impl Note {
    /// Create a new note with random nullifier and secret
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            nullifier: Fr::rand(rng),
            secret: Fr::rand(rng),
        }
    }

    /// Create a note from explicit values (for testing/recovery)
    pub fn from_parts(nullifier: Fr, secret: Fr) -> Self {
        Self { nullifier, secret }
    }

    /// Commitment = Poseidon(nullifier, secret)
    pub fn commitment(&self) -> Commitment {
        Commitment::from_field(poseidon_hash(&[self.nullifier, self.secret]))
    }

    /// NullifierHash = Poseidon(NULL_DOMAIN, nullifier)
    pub fn nullifier_hash(&self) -> NullifierHash {
        NullifierHash::from_field(poseidon_hash(&[
            Fr::from(NULLIFIER_DOMAIN),
            self.nullifier,
        ]))
    }
}

//! Cipherpool Privacy SDK
//!
//! Membership primitives for the shielded pool: note commitments, nullifier
//! hashes, the incremental commitment tree with its bounded root history, and
//! the write-once registries that reject replays.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Shielded Pool State                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │  MembershipHistory    │ │
//! │  │  (spent)     │  │  (deposited) │  │  (tree + root window) │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         ZK Proof (Groth16, BN254, external)             │   │
//! │  │  • Knowledge of (nullifier, secret) behind a leaf        │   │
//! │  │  • Leaf is a member of a known root                      │   │
//! │  │  • nullifier_hash = Poseidon(NULL, nullifier)            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All 256-bit values are big-endian integers over the BN254 scalar field.

pub mod commitment;
pub mod error;
pub mod field;
pub mod merkle;
pub mod note;
pub mod nullifier;
pub mod registry;

pub use commitment::Commitment;
pub use error::{FieldError, RegistryError, TreeError};
pub use field::{Address, bytes_to_field, field_to_bytes};
pub use merkle::{
    MAX_LEVELS, MembershipHistory, MerklePath, MerkleRoot, MerkleTree, NodeHasher, PoseidonHasher,
    poseidon_hash,
};
pub use note::Note;
pub use nullifier::NullifierHash;
pub use registry::{CommitmentRegistry, NullifierRegistry, WriteOnceSet};

//! Merkle Tree for Note Commitments
//!
//! Two views of the same append-only tree:
//!
//! - [`MembershipHistory`] is what the pool keeps: the filled left subtrees
//!   ("frontier"), the precomputed empty subtrees, and a ring buffer of the
//!   last `R` roots. An insertion touches only the `levels` nodes on the path
//!   from the new leaf to the root.
//! - [`MerkleTree`] is a sparse tree holding every node, kept by wallets and
//!   tests to build authentication paths.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   Z0        Z0 = empty leaf seed
//!               |   |   |
//!              C0  C1  C2            (Note Commitments)
//! ```
//!
//! Both sides of the proof system must agree bit-for-bit on the depth, the
//! (left, right) child order and the empty-leaf seed, or the roots diverge.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::PrimeField;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::commitment::Commitment;
use crate::error::{FieldError, TreeError};
use crate::field::{bytes_to_field, field_to_bytes};

/// Maximum supported tree depth (2^32 leaves)
pub const MAX_LEVELS: usize = 32;

/// Domain string hashed into the empty-leaf value
const ZERO_LEAF_SEED: &[u8] = b"cipherpool";

static POSEIDON: LazyLock<PoseidonConfig<Fr>> = LazyLock::new(poseidon_config);

/// Poseidon configuration
///
/// Field: BN254 Fr (254 bits)
/// Rate: 2, Capacity: 1
/// Rounds: 8 full, 57 partial, alpha 5
fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits: u64 = 254;
    let rate: usize = 2;
    let capacity: usize = 1;
    let full_rounds: u64 = 8;
    let partial_rounds: u64 = 57;
    let alpha: u64 = 5;
    let skip_matrices: u64 = 0;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        rate,
        full_rounds,
        partial_rounds,
        skip_matrices,
    );

    PoseidonConfig::new(
        full_rounds as usize,
        partial_rounds as usize,
        alpha,
        mds,
        ark,
        rate,
        capacity,
    )
}

/// Poseidon sponge over a sequence of field elements, one squeezed output
pub fn poseidon_hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(&POSEIDON);
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Two-to-one compression used for internal tree nodes
pub trait NodeHasher {
    /// Hash two children to get the parent. Order is (left, right).
    fn hash_pair(&self, left: &Fr, right: &Fr) -> Fr;
}

/// Poseidon-based node hasher (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonHasher;

impl NodeHasher for PoseidonHasher {
    fn hash_pair(&self, left: &Fr, right: &Fr) -> Fr {
        poseidon_hash(&[*left, *right])
    }
}

/// The empty-leaf value: `blake3("cipherpool") mod r`
pub fn zero_leaf() -> Fr {
    Fr::from_be_bytes_mod_order(blake3::hash(ZERO_LEAF_SEED).as_bytes())
}

/// Empty subtree roots for heights `0..=levels`
fn empty_subtrees<H: NodeHasher>(hasher: &H, levels: usize) -> Vec<Fr> {
    let mut zeros = Vec::with_capacity(levels + 1);
    let mut current = zero_leaf();
    zeros.push(current);
    for _ in 0..levels {
        current = hasher.hash_pair(&current, &current);
        zeros.push(current);
    }
    zeros
}

fn check_levels(levels: usize) -> Result<(), TreeError> {
    if levels == 0 || levels > MAX_LEVELS {
        return Err(TreeError::InvalidLevels {
            levels,
            max: MAX_LEVELS,
        });
    }
    Ok(())
}

/// A tree root (32 bytes, big-endian field element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerkleRoot(pub [u8; 32]);

impl MerkleRoot {
    pub fn from_field(f: Fr) -> Self {
        Self(field_to_bytes(f))
    }

    pub fn to_field(&self) -> Result<Fr, FieldError> {
        bytes_to_field(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ============================================================================
// Membership History (pool side)
// ============================================================================

/// Incremental commitment tree with a bounded window of recent roots
///
/// Proofs are generated against a root some time before they are submitted,
/// so any of the last `root_history_size` roots is accepted.
#[derive(Debug, Clone)]
pub struct MembershipHistory<H: NodeHasher = PoseidonHasher> {
    hasher: H,
    levels: usize,
    /// `zeros[i]` is the root of an empty subtree of height `i`
    zeros: Vec<Fr>,
    /// Last left child seen at each level
    filled_subtrees: Vec<Fr>,
    /// Ring buffer of recent roots; `None` until the slot is first written
    roots: Vec<Option<Fr>>,
    current_root_index: usize,
    next_index: u64,
}

impl MembershipHistory<PoseidonHasher> {
    /// Create an empty tree with the Poseidon node hasher
    pub fn new(levels: usize, root_history_size: usize) -> Result<Self, TreeError> {
        Self::with_hasher(PoseidonHasher, levels, root_history_size)
    }
}

impl<H: NodeHasher> MembershipHistory<H> {
    /// Create an empty tree with a custom node hasher
    ///
    /// The empty root is recorded as the first known root.
    pub fn with_hasher(
        hasher: H,
        levels: usize,
        root_history_size: usize,
    ) -> Result<Self, TreeError> {
        check_levels(levels)?;
        if root_history_size == 0 {
            return Err(TreeError::InvalidHistorySize);
        }

        let zeros = empty_subtrees(&hasher, levels);
        let filled_subtrees = zeros[..levels].to_vec();
        let mut roots = vec![None; root_history_size];
        roots[0] = Some(zeros[levels]);

        Ok(Self {
            hasher,
            levels,
            zeros,
            filled_subtrees,
            roots,
            current_root_index: 0,
            next_index: 0,
        })
    }

    /// Fail with `StructureFull` if no leaf slot is left
    pub fn ensure_capacity(&self) -> Result<(), TreeError> {
        if self.next_index >= self.capacity() {
            return Err(TreeError::StructureFull {
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Append a leaf and return its index
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, TreeError> {
        self.ensure_capacity()?;

        let index = self.next_index;
        let mut current_index = index;
        let mut current = leaf;

        for level in 0..self.levels {
            let (left, right) = if current_index & 1 == 0 {
                // Left child: remember it, pair with the empty right subtree
                self.filled_subtrees[level] = current;
                (current, self.zeros[level])
            } else {
                (self.filled_subtrees[level], current)
            };
            current = self.hasher.hash_pair(&left, &right);
            current_index >>= 1;
        }

        self.current_root_index = (self.current_root_index + 1) % self.roots.len();
        self.roots[self.current_root_index] = Some(current);
        self.next_index += 1;

        debug!("inserted leaf {} into membership tree", index);
        Ok(index)
    }

    /// Whether `root` is one of the retained recent roots
    pub fn is_known_root(&self, root: &MerkleRoot) -> bool {
        if root.0 == [0u8; 32] {
            return false;
        }
        let Ok(root) = root.to_field() else {
            return false;
        };

        // Walk backwards from the newest root; only the window is scanned
        let len = self.roots.len();
        (0..len)
            .map(|back| (self.current_root_index + len - back) % len)
            .any(|slot| self.roots[slot] == Some(root))
    }

    /// Current root
    pub fn root(&self) -> MerkleRoot {
        let root = self.roots[self.current_root_index].unwrap_or(self.zeros[self.levels]);
        MerkleRoot::from_field(root)
    }

    /// Index the next leaf will get
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Maximum number of leaves (`2^levels`)
    pub fn capacity(&self) -> u64 {
        1u64 << self.levels
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn root_history_size(&self) -> usize {
        self.roots.len()
    }

    /// Empty subtree root at the given height
    pub fn zero(&self, height: usize) -> Option<Fr> {
        self.zeros.get(height).copied()
    }
}

// ============================================================================
// Sparse Merkle Tree (wallet side)
// ============================================================================

/// A Merkle path proving inclusion of a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub siblings: Vec<[u8; 32]>,
    /// Position bits (false = left, true = right)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub position: u64,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &Commitment, root: &MerkleRoot) -> bool {
        self.verify_with(&PoseidonHasher, leaf, root)
    }

    /// Verify with a custom node hasher
    pub fn verify_with<H: NodeHasher>(
        &self,
        hasher: &H,
        leaf: &Commitment,
        root: &MerkleRoot,
    ) -> bool {
        let Ok(mut current) = leaf.to_field() else {
            return false;
        };

        for (sibling, is_right) in self.siblings.iter().zip(self.path_bits.iter()) {
            let Ok(sibling) = bytes_to_field(sibling) else {
                return false;
            };
            current = if *is_right {
                hasher.hash_pair(&sibling, &current)
            } else {
                hasher.hash_pair(&current, &sibling)
            };
        }

        MerkleRoot::from_field(current) == *root
    }

    /// Get the authentication path as field elements (for ZK circuits)
    pub fn to_field_elements(&self) -> Vec<Fr> {
        self.siblings
            .iter()
            .map(|s| Fr::from_be_bytes_mod_order(s))
            .collect()
    }
}

/// Sparse Merkle Tree for note commitments
///
/// Uses lazy evaluation - only stores non-empty nodes.
pub struct MerkleTree<H: NodeHasher = PoseidonHasher> {
    /// Non-empty nodes: (level, index) -> hash
    nodes: HashMap<(usize, u64), Fr>,
    /// Next available leaf position
    next_index: u64,
    levels: usize,
    zeros: Vec<Fr>,
    hasher: H,
    root: Fr,
}

impl MerkleTree<PoseidonHasher> {
    /// Create a new empty tree
    pub fn new(levels: usize) -> Result<Self, TreeError> {
        Self::with_hasher(PoseidonHasher, levels)
    }
}

impl<H: NodeHasher> MerkleTree<H> {
    pub fn with_hasher(hasher: H, levels: usize) -> Result<Self, TreeError> {
        check_levels(levels)?;
        let zeros = empty_subtrees(&hasher, levels);
        let root = zeros[levels];

        Ok(Self {
            nodes: HashMap::new(),
            next_index: 0,
            levels,
            zeros,
            hasher,
            root,
        })
    }

    /// Get current root
    pub fn root(&self) -> MerkleRoot {
        MerkleRoot::from_field(self.root)
    }

    /// Get next available position
    pub fn next_position(&self) -> u64 {
        self.next_index
    }

    /// Insert a commitment and return its position
    pub fn insert(&mut self, commitment: &Commitment) -> Result<u64, TreeError> {
        if self.next_index >= 1u64 << self.levels {
            return Err(TreeError::StructureFull {
                capacity: 1u64 << self.levels,
            });
        }
        // Non-canonical leaves are never accepted by the pool; reduce here
        let leaf = Fr::from_be_bytes_mod_order(&commitment.0);

        let position = self.next_index;
        self.nodes.insert((0, position), leaf);

        // Update path to root
        let mut current_index = position;
        let mut current_hash = leaf;

        for level in 0..self.levels {
            let is_right = current_index & 1 == 1;
            let sibling = self.node(level, current_index ^ 1);

            current_hash = if is_right {
                self.hasher.hash_pair(&sibling, &current_hash)
            } else {
                self.hasher.hash_pair(&current_hash, &sibling)
            };
            current_index /= 2;

            self.nodes.insert((level + 1, current_index), current_hash);
        }

        self.root = current_hash;
        self.next_index += 1;
        Ok(position)
    }

    /// Get Merkle path for a position
    pub fn path(&self, position: u64) -> Option<MerklePath> {
        if position >= self.next_index {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.levels);
        let mut path_bits = Vec::with_capacity(self.levels);
        let mut current_index = position;

        for level in 0..self.levels {
            path_bits.push(current_index & 1 == 1);
            siblings.push(field_to_bytes(self.node(level, current_index ^ 1)));
            current_index /= 2;
        }

        Some(MerklePath {
            siblings,
            path_bits,
            position,
        })
    }

    /// Get commitment at position
    pub fn get(&self, position: u64) -> Option<Commitment> {
        self.nodes
            .get(&(0, position))
            .map(|h| Commitment::from_field(*h))
    }

    fn node(&self, level: usize, index: u64) -> Fr {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zeros[level])
    }
}

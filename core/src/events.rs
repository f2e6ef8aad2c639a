//! Pool events
//!
//! Operations return their effects as values instead of emitting them on a
//! side channel. The engine also appends every event to its own log so an
//! indexer can replay them in order.

use serde::{Deserialize, Serialize};

use cipherpool_confidential::OpaqueAmount;
use cipherpool_privacy::{Address, Commitment, NullifierHash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PoolEvent {
    /// A commitment entered the tree
    Deposited {
        commitment: Commitment,
        leaf_index: u64,
        /// Unix seconds
        timestamp: u64,
    },
    /// A claim credited the confidential ledger
    Wrapped {
        recipient: Address,
        nullifier_hash: NullifierHash,
        relayer: Address,
        fee: u64,
    },
    /// A claim released the underlying asset
    Withdrawn {
        recipient: Address,
        nullifier_hash: NullifierHash,
        relayer: Address,
        fee: u64,
        refund: u64,
    },
    /// An unwrap was started; `amount` awaits disclosure
    PendingUnwrap {
        owner: Address,
        commitment: Commitment,
        amount: OpaqueAmount,
        index: u64,
    },
    UnwrapFinalized {
        index: u64,
        owner: Address,
        commitment: Commitment,
        leaf_index: u64,
    },
    /// The disclosed amount was zero: nothing was escrowed, no note created
    UnwrapFailed {
        index: u64,
        owner: Address,
        commitment: Commitment,
    },
}

/// Result of an operation together with the events it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub output: T,
    pub events: Vec<PoolEvent>,
}

impl<T> Applied<T> {
    pub fn new(output: T, events: Vec<PoolEvent>) -> Self {
        Self { output, events }
    }
}

use thiserror::Error;

use cipherpool_confidential::LedgerError;
use cipherpool_privacy::{
    Address, FieldError, MerkleRoot, NullifierHash, RegistryError, TreeError,
};

use crate::custody::CustodyError;

/// Errors surfaced by the shielded pool
///
/// Every variant is fatal to the operation that produced it; nothing is
/// retried internally and no state is mutated on the error path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("commitment tree is full ({capacity} leaves)")]
    StructureFull { capacity: u64 },

    #[error("already present: {0}")]
    AlreadyPresent(String),

    #[error("nullifier {0} has already been spent")]
    AlreadySpent(NullifierHash),

    #[error("root {0} is not in the recent root history")]
    UnknownRoot(MerkleRoot),

    #[error("proof verification failed")]
    InvalidProof,

    #[error("no pending unwrap with index {0}")]
    NotFound(u64),

    #[error("pending unwrap {0} was already finalized")]
    AlreadyProcessed(u64),

    #[error("invalid disclosure proof for pending unwrap {0}")]
    InvalidDisclosureProof(u64),

    #[error("{0} is the pool's escrow account")]
    ReservedAccount(Address),

    #[error("balance of {0} is not initialized")]
    ZeroBalance(Address),

    #[error("{0}")]
    NotInField(String),

    #[error("fee {fee} exceeds denomination {denomination}")]
    FeeExceedsDenomination { fee: u64, denomination: u64 },

    #[error("custody holds {available}, {required} required")]
    InsufficientCustody { available: u64, required: u64 },

    #[error("invalid pool parameters: {0}")]
    InvalidParameters(String),

    #[error("custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("pool service stopped")]
    ServiceStopped,
}

impl From<TreeError> for PoolError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::StructureFull { capacity } => Self::StructureFull { capacity },
            other => Self::InvalidParameters(other.to_string()),
        }
    }
}

impl From<RegistryError> for PoolError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::AlreadyPresent(value) => Self::AlreadyPresent(value),
        }
    }
}

impl From<FieldError> for PoolError {
    fn from(e: FieldError) -> Self {
        Self::NotInField(e.to_string())
    }
}

impl From<LedgerError> for PoolError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ZeroBalance(account) => Self::ZeroBalance(account),
            other => Self::Ledger(other),
        }
    }
}

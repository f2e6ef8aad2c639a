use thiserror::Error;

/// Commitment tree errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("merkle tree is full: all {capacity} leaves are used")]
    StructureFull { capacity: u64 },

    #[error("invalid tree depth {levels}: must be within 1..={max}")]
    InvalidLevels { levels: usize, max: usize },

    #[error("root history size must be non-zero")]
    InvalidHistorySize,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("value already present: {0}")]
    AlreadyPresent(String),
}

/// Field encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("value {0} is not a canonical BN254 scalar")]
    NotInField(String),
}

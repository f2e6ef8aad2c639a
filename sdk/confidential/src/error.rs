use thiserror::Error;

use cipherpool_privacy::Address;

use crate::handle::OpaqueAmount;

/// Confidential ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("balance of {0} is not initialized")]
    ZeroBalance(Address),

    #[error("unknown handle {0}")]
    UnknownHandle(String),

    #[error("{principal} is not allowed to decrypt {handle}")]
    Unauthorized {
        handle: OpaqueAmount,
        principal: Address,
    },

    #[error("handle {0} was never marked publicly decryptable")]
    NotDisclosed(OpaqueAmount),
}

/// Disclosure encoding / verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisclosureError {
    #[error("malformed clear amount: {0}")]
    MalformedAmount(String),

    #[error("invalid oracle public key")]
    InvalidOracleKey,
}

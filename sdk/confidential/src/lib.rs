//! Cipherpool Confidential Ledger
//!
//! Balances are opaque handles. The ledger never sees a cleartext amount: it
//! asks a [`SecureArithmetic`] backend to add, subtract and *select* between
//! handles, and learns a value only when one is explicitly disclosed through
//! a [`DecryptionOracle`] whose answer is checked by a [`DisclosureVerifier`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                   Oblivious transfer(from, to, x)                 │
//! │                                                                   │
//! │   ok, _   = try_sub(balance[from], x)      ok is an EncryptedBool │
//! │   actual  = select(ok, x, 0)               no branch on ok        │
//! │   balance[from] -= actual                                         │
//! │   balance[to]   += actual                                         │
//! │                                                                   │
//! │   insufficient funds  ⇒  actual = 0, learnt only on disclosure    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod arithmetic;
pub mod disclosure;
pub mod error;
pub mod handle;
pub mod ledger;
pub mod plaintext;

pub use arithmetic::SecureArithmetic;
pub use disclosure::{
    CLEAR_AMOUNT_LEN, DecryptionOracle, DisclosedAmount, DisclosureProof, DisclosureVerifier,
    Ed25519DisclosureVerifier, decode_clear_amount, encode_clear_amount,
};
pub use error::{DisclosureError, LedgerError};
pub use handle::{EncryptedBool, OpaqueAmount};
pub use ledger::{ConfidentialLedger, TransferFaultPolicy};
pub use plaintext::PlaintextBackend;

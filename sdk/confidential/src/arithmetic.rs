//! Backend interface for arithmetic over opaque amounts
//!
//! Implementations may be a homomorphic scheme or, for tests and reference
//! deployments, [`PlaintextBackend`](crate::PlaintextBackend). Ledger logic
//! is written once against this trait.

use cipherpool_privacy::Address;

use crate::error::LedgerError;
use crate::handle::{EncryptedBool, OpaqueAmount};

pub trait SecureArithmetic {
    /// Encrypt a public constant
    fn encrypt_trivial(&mut self, value: u64) -> OpaqueAmount;

    /// Encryption of zero
    fn zero(&mut self) -> OpaqueAmount {
        self.encrypt_trivial(0)
    }

    /// `a + b`, wrapping
    fn add(&mut self, a: &OpaqueAmount, b: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError>;

    /// `a - b`, wrapping
    fn sub(&mut self, a: &OpaqueAmount, b: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError>;

    /// `(ok, ok ? a + b : a)` where `ok` means the sum did not overflow
    fn try_sum(
        &mut self,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<(EncryptedBool, OpaqueAmount), LedgerError>;

    /// `(ok, ok ? a - b : a)` where `ok` means `a >= b`
    fn try_sub(
        &mut self,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<(EncryptedBool, OpaqueAmount), LedgerError>;

    /// `cond ? a : b` without revealing `cond`
    fn select(
        &mut self,
        cond: &EncryptedBool,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<OpaqueAmount, LedgerError>;

    /// Grant `principal` the right to request decryption of `handle`
    fn allow(&mut self, handle: &OpaqueAmount, principal: Address) -> Result<(), LedgerError>;

    fn is_allowed(&self, handle: &OpaqueAmount, principal: &Address) -> bool;

    /// Irreversibly allow anyone to obtain a verifiable decryption of `handle`
    fn make_publicly_decryptable(&mut self, handle: &OpaqueAmount) -> Result<(), LedgerError>;

    fn is_publicly_decryptable(&self, handle: &OpaqueAmount) -> bool;
}

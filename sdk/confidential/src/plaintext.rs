//! Plaintext reference backend
//!
//! Holds every amount in the clear behind a random-looking handle. It gives
//! no confidentiality and exists so the ledger and pool logic can be tested
//! and audited without a homomorphic scheme. Even so, `select` and the
//! `try_*` operations are computed with mask arithmetic, never with a branch
//! on the secret flag, so the data flow matches what a real backend sees.
//!
//! The backend doubles as the decryption oracle: disclosures are attested by
//! an ed25519 signature over `(handle, clear_bytes)`.

use ed25519_dalek::{Signer, SigningKey};
use log::debug;
use std::collections::{HashMap, HashSet};

use cipherpool_privacy::Address;

use crate::arithmetic::SecureArithmetic;
use crate::disclosure::{
    DecryptionOracle, DisclosedAmount, DisclosureProof, Ed25519DisclosureVerifier,
    disclosure_message, encode_clear_amount,
};
use crate::error::LedgerError;
use crate::handle::{EncryptedBool, OpaqueAmount};

const HANDLE_DOMAIN: &[u8] = b"cipherpool-handle-v1";

/// `flag ? a : b` for a flag that is exactly 0 or 1
fn ct_select(flag: u64, a: u64, b: u64) -> u64 {
    let mask = flag.wrapping_neg();
    b ^ ((a ^ b) & mask)
}

pub struct PlaintextBackend {
    amounts: HashMap<OpaqueAmount, u64>,
    /// Comparison results, stored as 0 or 1
    flags: HashMap<EncryptedBool, u64>,
    acl: HashMap<OpaqueAmount, HashSet<Address>>,
    public: HashSet<OpaqueAmount>,
    nonce: u64,
    oracle_key: SigningKey,
}

impl PlaintextBackend {
    /// Create a backend whose oracle signs with the key derived from `oracle_seed`
    pub fn new(oracle_seed: [u8; 32]) -> Self {
        Self {
            amounts: HashMap::new(),
            flags: HashMap::new(),
            acl: HashMap::new(),
            public: HashSet::new(),
            nonce: 0,
            oracle_key: SigningKey::from_bytes(&oracle_seed),
        }
    }

    /// Public key of the decryption oracle
    pub fn oracle_public_key(&self) -> [u8; 32] {
        self.oracle_key.verifying_key().to_bytes()
    }

    /// Verifier matching this backend's oracle
    pub fn disclosure_verifier(&self) -> Ed25519DisclosureVerifier {
        Ed25519DisclosureVerifier::new(self.oracle_key.verifying_key())
    }

    /// Decrypt `handle` on behalf of `principal`, enforcing the ACL
    pub fn user_decrypt(
        &self,
        handle: &OpaqueAmount,
        principal: &Address,
    ) -> Result<u64, LedgerError> {
        if !self.is_allowed(handle, principal) {
            return Err(LedgerError::Unauthorized {
                handle: *handle,
                principal: *principal,
            });
        }
        self.load(handle)
    }

    /// Number of ciphertexts allocated so far
    pub fn handle_count(&self) -> usize {
        self.amounts.len() + self.flags.len()
    }

    fn next_handle(&mut self, tag: &[u8]) -> [u8; 32] {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(tag);
        hasher.update(&self.nonce.to_be_bytes());
        *hasher.finalize().as_bytes()
    }

    fn store(&mut self, value: u64) -> OpaqueAmount {
        let handle = OpaqueAmount(self.next_handle(b"u64"));
        self.amounts.insert(handle, value);
        handle
    }

    fn store_flag(&mut self, flag: u64) -> EncryptedBool {
        let handle = EncryptedBool(self.next_handle(b"bool"));
        self.flags.insert(handle, flag);
        handle
    }

    fn load(&self, handle: &OpaqueAmount) -> Result<u64, LedgerError> {
        self.amounts
            .get(handle)
            .copied()
            .ok_or_else(|| LedgerError::UnknownHandle(handle.to_string()))
    }

    fn load_flag(&self, handle: &EncryptedBool) -> Result<u64, LedgerError> {
        self.flags
            .get(handle)
            .copied()
            .ok_or_else(|| LedgerError::UnknownHandle(handle.to_string()))
    }
}

impl SecureArithmetic for PlaintextBackend {
    fn encrypt_trivial(&mut self, value: u64) -> OpaqueAmount {
        self.store(value)
    }

    fn add(&mut self, a: &OpaqueAmount, b: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError> {
        let sum = self.load(a)?.wrapping_add(self.load(b)?);
        Ok(self.store(sum))
    }

    fn sub(&mut self, a: &OpaqueAmount, b: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError> {
        let diff = self.load(a)?.wrapping_sub(self.load(b)?);
        Ok(self.store(diff))
    }

    fn try_sum(
        &mut self,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<(EncryptedBool, OpaqueAmount), LedgerError> {
        let a = self.load(a)?;
        let (sum, overflow) = a.overflowing_add(self.load(b)?);
        let ok = (!overflow) as u64;
        let result = ct_select(ok, sum, a);
        Ok((self.store_flag(ok), self.store(result)))
    }

    fn try_sub(
        &mut self,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<(EncryptedBool, OpaqueAmount), LedgerError> {
        let a = self.load(a)?;
        let (diff, borrow) = a.overflowing_sub(self.load(b)?);
        let ok = (!borrow) as u64;
        let result = ct_select(ok, diff, a);
        Ok((self.store_flag(ok), self.store(result)))
    }

    fn select(
        &mut self,
        cond: &EncryptedBool,
        a: &OpaqueAmount,
        b: &OpaqueAmount,
    ) -> Result<OpaqueAmount, LedgerError> {
        let flag = self.load_flag(cond)?;
        let chosen = ct_select(flag, self.load(a)?, self.load(b)?);
        Ok(self.store(chosen))
    }

    fn allow(&mut self, handle: &OpaqueAmount, principal: Address) -> Result<(), LedgerError> {
        if !self.amounts.contains_key(handle) {
            return Err(LedgerError::UnknownHandle(handle.to_string()));
        }
        self.acl.entry(*handle).or_default().insert(principal);
        Ok(())
    }

    fn is_allowed(&self, handle: &OpaqueAmount, principal: &Address) -> bool {
        self.acl
            .get(handle)
            .is_some_and(|allowed| allowed.contains(principal))
    }

    fn make_publicly_decryptable(&mut self, handle: &OpaqueAmount) -> Result<(), LedgerError> {
        if !self.amounts.contains_key(handle) {
            return Err(LedgerError::UnknownHandle(handle.to_string()));
        }
        if self.public.insert(*handle) {
            debug!("handle {} marked publicly decryptable", handle);
        }
        Ok(())
    }

    fn is_publicly_decryptable(&self, handle: &OpaqueAmount) -> bool {
        self.public.contains(handle)
    }
}

impl DecryptionOracle for PlaintextBackend {
    fn public_decrypt(&self, handle: &OpaqueAmount) -> Result<DisclosedAmount, LedgerError> {
        if !self.is_publicly_decryptable(handle) {
            return Err(LedgerError::NotDisclosed(*handle));
        }
        let clear_bytes = encode_clear_amount(self.load(handle)?).to_vec();
        let signature = self
            .oracle_key
            .sign(&disclosure_message(handle, &clear_bytes));

        Ok(DisclosedAmount {
            handle: *handle,
            clear_bytes,
            proof: DisclosureProof(signature.to_bytes().to_vec()),
        })
    }
}

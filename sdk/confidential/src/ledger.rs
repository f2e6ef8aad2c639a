//! Confidential Ledger
//!
//! Balance bookkeeping over opaque handles. Every debit is computed as both
//! outcomes and resolved with [`SecureArithmetic::select`]; the ledger never
//! learns whether a debit "really" happened.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use cipherpool_privacy::Address;

use crate::arithmetic::SecureArithmetic;
use crate::error::LedgerError;
use crate::handle::OpaqueAmount;

/// What an oblivious transfer does when the sender has never held a balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFaultPolicy {
    /// Fail with `ZeroBalance` (the sender's existence is public anyway)
    #[default]
    Reject,
    /// Move an opaque zero, exactly like an insufficient balance
    ZeroAmount,
}

/// Confidential balances and total supply
pub struct ConfidentialLedger<B: SecureArithmetic> {
    backend: B,
    /// Principal that operates the ledger; granted access to every handle
    operator: Address,
    balances: HashMap<Address, OpaqueAmount>,
    total_supply: OpaqueAmount,
    policy: TransferFaultPolicy,
}

impl<B: SecureArithmetic> ConfidentialLedger<B> {
    pub fn new(backend: B, operator: Address) -> Self {
        Self::with_policy(backend, operator, TransferFaultPolicy::default())
    }

    pub fn with_policy(backend: B, operator: Address, policy: TransferFaultPolicy) -> Self {
        Self {
            backend,
            operator,
            balances: HashMap::new(),
            total_supply: OpaqueAmount::UNINITIALIZED,
            policy,
        }
    }

    /// Increase `to`'s balance and the total supply by `amount`
    ///
    /// If the supply would overflow, an opaque zero is minted instead.
    /// Returns the handle of the amount actually minted.
    pub fn mint(&mut self, to: Address, amount: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError> {
        let supply = self.initialized_or_zero(self.total_supply);
        let (ok, new_supply) = self.backend.try_sum(&supply, amount)?;
        let zero = self.backend.zero();
        let minted = self.backend.select(&ok, amount, &zero)?;

        let balance = self.balance_or_zero(&to);
        let new_balance = self.backend.add(&balance, &minted)?;

        self.backend.allow(&new_balance, to)?;
        self.backend.allow(&new_balance, self.operator)?;
        self.backend.allow(&new_supply, self.operator)?;
        self.backend.allow(&minted, self.operator)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;
        debug!("minted to {}", to);
        Ok(minted)
    }

    /// Decrease `from`'s balance and the total supply by `amount`
    ///
    /// If the balance is short, an opaque zero is burned instead. Returns the
    /// handle of the amount actually burned.
    pub fn burn(&mut self, from: Address, amount: &OpaqueAmount) -> Result<OpaqueAmount, LedgerError> {
        let balance = self
            .balance_of(&from)
            .ok_or(LedgerError::ZeroBalance(from))?;

        let (ok, new_balance) = self.backend.try_sub(&balance, amount)?;
        let zero = self.backend.zero();
        let burned = self.backend.select(&ok, amount, &zero)?;

        let supply = self.initialized_or_zero(self.total_supply);
        let new_supply = self.backend.sub(&supply, &burned)?;

        self.backend.allow(&new_balance, from)?;
        self.backend.allow(&new_balance, self.operator)?;
        self.backend.allow(&new_supply, self.operator)?;
        self.backend.allow(&burned, self.operator)?;

        self.balances.insert(from, new_balance);
        self.total_supply = new_supply;
        debug!("burned from {}", from);
        Ok(burned)
    }

    /// Move up to `requested` from `from` to `to` without branching on
    /// whether `from` can afford it
    ///
    /// Returns the handle of the amount that moved: `requested` if the
    /// balance covered it, an opaque zero otherwise. Which of the two it is
    /// can only be learnt by disclosing the returned handle.
    pub fn oblivious_transfer(
        &mut self,
        from: Address,
        to: Address,
        requested: &OpaqueAmount,
    ) -> Result<OpaqueAmount, LedgerError> {
        let from_balance = match (self.balance_of(&from), self.policy) {
            (Some(balance), _) => balance,
            (None, TransferFaultPolicy::ZeroAmount) => self.backend.zero(),
            (None, TransferFaultPolicy::Reject) => return Err(LedgerError::ZeroBalance(from)),
        };

        // Both outcomes are computed; `ok` is only ever consumed by select
        let (ok, _) = self.backend.try_sub(&from_balance, requested)?;
        let zero = self.backend.zero();
        let actual = self.backend.select(&ok, requested, &zero)?;

        let new_from = self.backend.sub(&from_balance, &actual)?;
        let to_balance = if from == to {
            new_from
        } else {
            self.balance_or_zero(&to)
        };
        let new_to = self.backend.add(&to_balance, &actual)?;

        for principal in [from, to, self.operator] {
            self.backend.allow(&actual, principal)?;
        }
        self.backend.allow(&new_from, from)?;
        self.backend.allow(&new_from, self.operator)?;
        self.backend.allow(&new_to, to)?;
        self.backend.allow(&new_to, self.operator)?;

        self.balances.insert(from, new_from);
        self.balances.insert(to, new_to);
        debug!("oblivious transfer {} -> {}", from, to);
        Ok(actual)
    }

    /// Mark `amount` publicly decryptable. Irreversible.
    pub fn request_disclosure(&mut self, amount: &OpaqueAmount) -> Result<(), LedgerError> {
        self.backend.make_publicly_decryptable(amount)
    }

    /// Current balance handle, `None` if never initialized
    pub fn balance_of(&self, account: &Address) -> Option<OpaqueAmount> {
        self.balances
            .get(account)
            .copied()
            .filter(OpaqueAmount::is_initialized)
    }

    /// Total supply handle, `None` before the first mint
    pub fn total_supply(&self) -> Option<OpaqueAmount> {
        Some(self.total_supply).filter(OpaqueAmount::is_initialized)
    }

    /// Accounts that have ever held a balance
    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.balances.keys()
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn policy(&self) -> TransferFaultPolicy {
        self.policy
    }

    /// Encrypt a public constant (e.g. the pool denomination)
    pub fn encrypt_constant(&mut self, value: u64) -> OpaqueAmount {
        self.backend.encrypt_trivial(value)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn balance_or_zero(&mut self, account: &Address) -> OpaqueAmount {
        match self.balance_of(account) {
            Some(balance) => balance,
            None => self.backend.zero(),
        }
    }

    fn initialized_or_zero(&mut self, handle: OpaqueAmount) -> OpaqueAmount {
        if handle.is_initialized() {
            handle
        } else {
            self.backend.zero()
        }
    }
}

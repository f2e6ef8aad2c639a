//! Asset Custody
//!
//! Movement of the underlying (public) asset in and out of the pool. The
//! engine only needs two transfers and a balance check; how the asset is
//! actually held is up to the implementation.

use log::debug;
use std::collections::HashMap;
use thiserror::Error;

use cipherpool_privacy::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("{account} holds {available}, cannot transfer {amount}")]
    InsufficientFunds {
        account: Address,
        available: u64,
        amount: u64,
    },

    #[error("pool holds {available}, cannot release {amount}")]
    InsufficientReserves { available: u64, amount: u64 },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Custody of the pool's underlying asset
pub trait AssetCustody {
    /// Pull `amount` from `from` into the pool
    fn transfer_in(&mut self, from: Address, amount: u64) -> Result<(), CustodyError>;

    /// Release `amount` from the pool to `to`
    fn transfer_out(&mut self, to: Address, amount: u64) -> Result<(), CustodyError>;

    /// Release every `(to, amount)` payout, or none of them
    ///
    /// On `Err` no payout may have taken effect.
    fn release(&mut self, payouts: &[(Address, u64)]) -> Result<(), CustodyError>;

    /// Amount currently held by the pool
    fn available(&self) -> u64;
}

/// In-process custody: a flat map of external balances plus the pool reserve
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    balances: HashMap<Address, u64>,
    reserve: u64,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an external account (test faucet)
    pub fn fund(&mut self, account: Address, amount: u64) {
        *self.balances.entry(account).or_default() += amount;
    }

    pub fn balance_of(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

impl AssetCustody for InMemoryCustody {
    fn transfer_in(&mut self, from: Address, amount: u64) -> Result<(), CustodyError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(CustodyError::InsufficientFunds {
                account: from,
                available,
                amount,
            });
        }
        let reserve = self
            .reserve
            .checked_add(amount)
            .ok_or_else(|| CustodyError::Rejected("pool reserve overflow".into()))?;

        self.balances.insert(from, available - amount);
        self.reserve = reserve;
        debug!("custody: {} -> pool ({})", from, amount);
        Ok(())
    }

    fn transfer_out(&mut self, to: Address, amount: u64) -> Result<(), CustodyError> {
        if self.reserve < amount {
            return Err(CustodyError::InsufficientReserves {
                available: self.reserve,
                amount,
            });
        }
        self.reserve -= amount;
        *self.balances.entry(to).or_default() += amount;
        debug!("custody: pool -> {} ({})", to, amount);
        Ok(())
    }

    fn release(&mut self, payouts: &[(Address, u64)]) -> Result<(), CustodyError> {
        let total = payouts
            .iter()
            .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or_else(|| CustodyError::Rejected("payout total overflows".into()))?;
        if self.reserve < total {
            return Err(CustodyError::InsufficientReserves {
                available: self.reserve,
                amount: total,
            });
        }

        for (to, amount) in payouts {
            self.reserve -= amount;
            *self.balances.entry(*to).or_default() += amount;
            debug!("custody: pool -> {} ({})", to, amount);
        }
        Ok(())
    }

    fn available(&self) -> u64 {
        self.reserve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_in_and_out() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let mut custody = InMemoryCustody::new();
        custody.fund(alice, 10);

        custody.transfer_in(alice, 7).unwrap();
        assert_eq!(custody.available(), 7);
        assert_eq!(custody.balance_of(&alice), 3);

        custody.transfer_out(bob, 5).unwrap();
        assert_eq!(custody.available(), 2);
        assert_eq!(custody.balance_of(&bob), 5);
    }

    #[test]
    fn test_failed_transfers_leave_state_untouched() {
        let alice = Address::from_low_u64(1);
        let mut custody = InMemoryCustody::new();
        custody.fund(alice, 3);

        assert!(matches!(
            custody.transfer_in(alice, 4),
            Err(CustodyError::InsufficientFunds { available: 3, .. })
        ));
        assert!(matches!(
            custody.transfer_out(alice, 1),
            Err(CustodyError::InsufficientReserves { available: 0, .. })
        ));
        assert_eq!(custody.balance_of(&alice), 3);
        assert_eq!(custody.available(), 0);
    }

    #[test]
    fn test_release_is_all_or_nothing() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let carol = Address::from_low_u64(3);
        let mut custody = InMemoryCustody::new();
        custody.fund(alice, 10);
        custody.transfer_in(alice, 10).unwrap();

        assert!(matches!(
            custody.release(&[(bob, 6), (carol, 5)]),
            Err(CustodyError::InsufficientReserves {
                available: 10,
                amount: 11
            })
        ));
        assert_eq!(custody.balance_of(&bob), 0);
        assert_eq!(custody.available(), 10);

        custody.release(&[(bob, 6), (carol, 4)]).unwrap();
        assert_eq!(custody.balance_of(&bob), 6);
        assert_eq!(custody.balance_of(&carol), 4);
        assert_eq!(custody.available(), 0);
    }
}

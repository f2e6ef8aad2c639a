//! Pending Unwraps
//!
//! Two-phase unwrap: `unwrap` moves an opaque amount into escrow and asks for
//! its disclosure; `finalize_unwrap` consumes the record once the cleartext
//! is known.
//!
//! ```text
//!   Created ──(cleartext != 0)──► Finalized(Success)   record deleted
//!      │
//!      └────(cleartext == 0)───► Finalized(Failure)   record deleted
//! ```
//!
//! A live record reserves its commitment so no other unwrap or deposit can
//! claim the same leaf value before it finalizes.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use cipherpool_confidential::OpaqueAmount;
use cipherpool_privacy::{Address, Commitment};

use crate::error::PoolError;

/// A started, not yet finalized unwrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUnwrap {
    pub owner: Address,
    pub commitment: Commitment,
    /// Amount that actually moved into escrow (opaque)
    pub amount: OpaqueAmount,
}

#[derive(Debug, Clone, Default)]
pub struct PendingUnwrapRegistry {
    records: BTreeMap<u64, PendingUnwrap>,
    reserved: HashSet<Commitment>,
    next_index: u64,
}

impl PendingUnwrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live record targets `commitment`
    pub fn is_reserved(&self, commitment: &Commitment) -> bool {
        self.reserved.contains(commitment)
    }

    /// Store a new record under a fresh index
    pub fn create(
        &mut self,
        owner: Address,
        commitment: Commitment,
        amount: OpaqueAmount,
    ) -> Result<u64, PoolError> {
        if !self.reserved.insert(commitment) {
            return Err(PoolError::AlreadyPresent(commitment.to_string()));
        }
        let index = self.next_index;
        self.next_index += 1;
        self.records.insert(
            index,
            PendingUnwrap {
                owner,
                commitment,
                amount,
            },
        );
        debug!("pending unwrap {} created", index);
        Ok(index)
    }

    /// Live record at `index`
    ///
    /// `NotFound` if the index was never issued, `AlreadyProcessed` if it
    /// was issued and has since been finalized.
    pub fn live(&self, index: u64) -> Result<&PendingUnwrap, PoolError> {
        match self.records.get(&index) {
            Some(record) => Ok(record),
            None if index < self.next_index => Err(PoolError::AlreadyProcessed(index)),
            None => Err(PoolError::NotFound(index)),
        }
    }

    pub fn get(&self, index: u64) -> Option<&PendingUnwrap> {
        self.records.get(&index)
    }

    /// Delete a live record and release its reservation
    pub fn finalize(&mut self, index: u64) -> Result<PendingUnwrap, PoolError> {
        self.live(index)?;
        let record = self
            .records
            .remove(&index)
            .ok_or(PoolError::AlreadyProcessed(index))?;
        self.reserved.remove(&record.commitment);
        debug!("pending unwrap {} finalized", index);
        Ok(record)
    }

    /// Index the next record will get
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commitment(byte: u8) -> Commitment {
        Commitment([byte; 32])
    }

    #[test]
    fn test_indices_increase() {
        let mut registry = PendingUnwrapRegistry::new();
        let owner = Address::from_low_u64(1);
        let a = registry
            .create(owner, commitment(1), OpaqueAmount([1; 32]))
            .unwrap();
        let b = registry
            .create(owner, commitment(2), OpaqueAmount([2; 32]))
            .unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_finalize_once() {
        let mut registry = PendingUnwrapRegistry::new();
        let owner = Address::from_low_u64(1);
        let index = registry
            .create(owner, commitment(1), OpaqueAmount([1; 32]))
            .unwrap();

        let record = registry.finalize(index).unwrap();
        assert_eq!(record.owner, owner);
        assert_eq!(registry.finalize(index), Err(PoolError::AlreadyProcessed(0)));
        assert_eq!(registry.finalize(7), Err(PoolError::NotFound(7)));
        assert!(registry.get(index).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reservation_released_on_finalize() {
        let mut registry = PendingUnwrapRegistry::new();
        let owner = Address::from_low_u64(1);
        let index = registry
            .create(owner, commitment(5), OpaqueAmount([1; 32]))
            .unwrap();

        assert!(registry.is_reserved(&commitment(5)));
        assert!(matches!(
            registry.create(owner, commitment(5), OpaqueAmount([2; 32])),
            Err(PoolError::AlreadyPresent(_))
        ));
        // a rejected create does not burn an index
        assert_eq!(registry.next_index(), 1);

        registry.finalize(index).unwrap();
        assert!(!registry.is_reserved(&commitment(5)));
        assert_eq!(
            registry
                .create(owner, commitment(5), OpaqueAmount([2; 32]))
                .unwrap(),
            1
        );
    }
}

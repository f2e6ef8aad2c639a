//! Write-once registries
//!
//! Membership sets that only grow. The existence check and the insert run
//! under the same `&mut` borrow, so no caller can act on a stale "absent".

use std::collections::HashSet;
use std::collections::hash_set::Iter;
use std::fmt::Display;
use std::hash::Hash;

use crate::commitment::Commitment;
use crate::error::RegistryError;
use crate::nullifier::NullifierHash;

/// Append-only, duplicate-free set
#[derive(Debug, Clone)]
pub struct WriteOnceSet<T> {
    members: HashSet<T>,
}

/// Commitments ever deposited or credited
pub type CommitmentRegistry = WriteOnceSet<Commitment>;

/// Nullifier hashes spent by either wrap or withdraw
pub type NullifierRegistry = WriteOnceSet<NullifierHash>;

impl<T: Eq + Hash + Display> WriteOnceSet<T> {
    pub fn new() -> Self {
        Self {
            members: HashSet::new(),
        }
    }

    /// Record `value`, failing if it was recorded before
    pub fn insert(&mut self, value: T) -> Result<(), RegistryError> {
        if self.members.contains(&value) {
            return Err(RegistryError::AlreadyPresent(value.to_string()));
        }
        self.members.insert(value);
        Ok(())
    }

    pub fn contains(&self, value: &T) -> bool {
        self.members.contains(value)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.members.iter()
    }
}

impl<T: Eq + Hash + Display> Default for WriteOnceSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullifier_double_spend() {
        let mut registry = NullifierRegistry::new();
        let nullifier = NullifierHash([42u8; 32]);

        assert!(registry.insert(nullifier).is_ok());
        assert!(registry.contains(&nullifier));

        let err = registry.insert(nullifier).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyPresent(ref s) if s.starts_with("0x2a2a")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_commitments_are_independent() {
        let mut registry = CommitmentRegistry::default();
        assert!(registry.is_empty());
        registry.insert(Commitment([1u8; 32])).unwrap();
        registry.insert(Commitment([2u8; 32])).unwrap();
        assert_eq!(registry.iter().count(), 2);
        assert!(!registry.contains(&Commitment([3u8; 32])));
    }
}

//! Keyed storage for special validator records
//!
//! The module never owns its backing store: the host hands in a [`KvStore`]
//! handle at construction, so separate chain instances never share state.
//!
//! ## Layout
//!
//! ```text
//! 0x11 | len(addr) | addr  ->  bincode(SpecialValidator)
//! ```
//!
//! Iteration follows key byte order, which is stable across replays of the
//! same state.

use crate::types::{SpecialValidator, ValAddress};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key prefix for special validator records
pub const SPECIAL_VALIDATOR_PREFIX: u8 = 0x11;

/// storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Raw byte-keyed store backend
///
/// Methods take `&self`: records are written from staking hooks while the
/// reconciliation pass is iterating, so backends use interior mutability.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Snapshot of all entries under `prefix`, in key order
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Store key for a special validator record
pub fn special_validator_key(addr: &ValAddress) -> Vec<u8> {
    let bytes = addr.as_bytes();
    let mut key = Vec::with_capacity(2 + bytes.len());
    key.push(SPECIAL_VALIDATOR_PREFIX);
    key.push(bytes.len() as u8);
    key.extend_from_slice(bytes);
    key
}

/// Typed handle over the special validator records
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct SpecialValidatorStore {
    kv: Arc<dyn KvStore>,
}

impl SpecialValidatorStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Handle over a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self, addr: &ValAddress) -> Result<Option<SpecialValidator>, StoreError> {
        self.kv
            .get(&special_validator_key(addr))?
            .map(|bz| bincode::deserialize(&bz).map_err(StoreError::from))
            .transpose()
    }

    pub fn contains(&self, addr: &ValAddress) -> Result<bool, StoreError> {
        Ok(self.kv.get(&special_validator_key(addr))?.is_some())
    }

    pub fn set(&self, validator: &SpecialValidator) -> Result<(), StoreError> {
        let bz = bincode::serialize(validator)?;
        self.kv.set(&special_validator_key(&validator.address), bz)
    }

    pub fn delete(&self, addr: &ValAddress) -> Result<(), StoreError> {
        self.kv.delete(&special_validator_key(addr))
    }

    /// All records in store order
    pub fn all(&self) -> Result<Vec<SpecialValidator>, StoreError> {
        self.kv
            .prefix_scan(&[SPECIAL_VALIDATOR_PREFIX])?
            .into_iter()
            .map(|(_, bz)| bincode::deserialize(&bz).map_err(StoreError::from))
            .collect()
    }

    /// All addresses in store order
    pub fn addresses(&self) -> Result<Vec<ValAddress>, StoreError> {
        Ok(self.all()?.into_iter().map(|v| v.address).collect())
    }
}

impl std::fmt::Debug for SpecialValidatorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialValidatorStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ADDRESS_LEN;

    fn addr(id: u8) -> ValAddress {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = id;
        ValAddress::new(bytes)
    }

    #[test]
    fn test_key_is_length_prefixed() {
        let key = special_validator_key(&addr(9));
        assert_eq!(key[0], SPECIAL_VALIDATOR_PREFIX);
        assert_eq!(key[1], ADDRESS_LEN as u8);
        assert_eq!(key[2], 9);
        assert_eq!(key.len(), 2 + ADDRESS_LEN);
    }

    #[test]
    fn test_set_get_delete() {
        let store = SpecialValidatorStore::in_memory();
        let record = SpecialValidator {
            address: addr(1),
            power: 42,
            is_deleting: true,
        };

        assert_eq!(store.get(&addr(1)).unwrap(), None);
        store.set(&record).unwrap();
        assert_eq!(store.get(&addr(1)).unwrap(), Some(record));
        assert!(store.contains(&addr(1)).unwrap());

        store.delete(&addr(1)).unwrap();
        assert!(!store.contains(&addr(1)).unwrap());
    }

    #[test]
    fn test_set_overwrites_single_record() {
        let store = SpecialValidatorStore::in_memory();
        store.set(&SpecialValidator::new(addr(1))).unwrap();
        store
            .set(&SpecialValidator {
                power: 7,
                ..SpecialValidator::new(addr(1))
            })
            .unwrap();

        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].power, 7);
    }

    #[test]
    fn test_iteration_in_key_order() {
        let store = SpecialValidatorStore::in_memory();
        for id in [5u8, 1, 3] {
            store.set(&SpecialValidator::new(addr(id))).unwrap();
        }

        assert_eq!(store.addresses().unwrap(), vec![addr(1), addr(3), addr(5)]);
    }

    #[test]
    fn test_prefix_scan_ignores_other_prefixes() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(&[0x10, 1], vec![1]).unwrap();
        kv.set(&[0x12, 1], vec![2]).unwrap();

        let store = SpecialValidatorStore::new(kv.clone());
        store.set(&SpecialValidator::new(addr(2))).unwrap();

        assert_eq!(store.all().unwrap().len(), 1);
        assert_eq!(kv.len(), 3);
    }

    #[test]
    fn test_clones_share_backend() {
        let store = SpecialValidatorStore::in_memory();
        let other = store.clone();
        store.set(&SpecialValidator::new(addr(4))).unwrap();
        assert!(other.contains(&addr(4)).unwrap());
    }
}

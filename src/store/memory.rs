use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::Store;
use crate::error::StoreError;

/// A [`Store`] kept entirely in memory.
///
/// Useful for tests and for building a tree whose nodes are shipped elsewhere
/// afterwards. Safe to share between tasks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, including ones no root references any more.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.records.read().contains_key(key)
    }

    /// Overwrites a record in place. Only meant for simulating corruption.
    pub fn tamper(&self, key: &[u8], value: Vec<u8>) {
        self.records.write().insert(key.to_vec(), value);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(hex::encode(key)))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.records.write().insert(key.to_vec(), value);
        Ok(())
    }
}

//! The key/value boundary the tree persists nodes through.
//!
//! Nodes are written under their own content hash, so a store only ever sees
//! `put` for keys it has never held, or for keys it already holds with the
//! same bytes. Implementations need no transactions or ordering.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use memory::MemoryStore;

use crate::error::StoreError;

#[async_trait]
pub trait Store: Send + Sync {
    /// Fetches the bytes stored under `key`, or [`StoreError::NotFound`].
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }
}

//! Ephemeral in-memory backend, used in tests and as the innermost layer of
//! local development stacks.

use std::collections::HashMap;

use async_trait::async_trait;
use meridian_da_primitives::{hash::tree_hash, BlobHash};
use tokio::sync::RwLock;

use crate::{ExpirationPolicy, StorageError, StorageReader, StorageResult, StorageService};

#[derive(Debug, Default)]
pub struct MemoryStorageService {
    entries: RwLock<HashMap<BlobHash, Vec<u8>>>,
}

impl MemoryStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under an explicit key instead of its tree hash. Needed
    /// when seeding entries keyed under the legacy flat scheme or its
    /// migration bridge.
    pub async fn put_under(&self, hash: BlobHash, data: Vec<u8>) {
        self.entries.write().await.insert(hash, data);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageReader for MemoryStorageService {
    async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>> {
        self.entries
            .read()
            .await
            .get(&hash)
            .cloned()
            .ok_or(StorageError::NotFound(hash))
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        ExpirationPolicy::KeepForever
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn put(&self, data: &[u8], _timeout: u64) -> StorageResult<()> {
        let hash = tree_hash(data);
        self.entries.write().await.insert(hash, data.to_vec());
        Ok(())
    }

    async fn sync(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn put_stores_under_the_tree_hash() {
        let store = MemoryStorageService::new();
        let data = vec![0xaa; 100];
        store.put(&data, 0).await.unwrap();
        assert_eq!(store.get_by_hash(tree_hash(&data)).await.unwrap(), data);
    }

    #[tokio::test]
    async fn missing_entry_is_not_found() {
        let store = MemoryStorageService::new();
        assert_matches!(
            store.get_by_hash(BlobHash::repeat_byte(1)).await,
            Err(StorageError::NotFound(_))
        );
    }
}

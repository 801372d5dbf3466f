//! Read-through composition of two storage services.
//!
//! Reads try the front store and fall back to the back store; writes land
//! in the authoritative back store first and in the front store on a best
//! effort basis. Chaining a cache-like front over an archival back gives
//! the usual cache-in-front-of-store stack without any dynamic dispatch.

use async_trait::async_trait;
use meridian_da_primitives::BlobHash;

use crate::{ExpirationPolicy, StorageError, StorageReader, StorageResult, StorageService};

#[derive(Debug)]
pub struct ChainedStorageService<F, B> {
    front: F,
    back: B,
}

impl<F: StorageService, B: StorageService> ChainedStorageService<F, B> {
    pub fn new(front: F, back: B) -> Self {
        Self { front, back }
    }
}

#[async_trait]
impl<F: StorageService, B: StorageService> StorageReader for ChainedStorageService<F, B> {
    async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>> {
        match self.front.get_by_hash(hash).await {
            Ok(data) => return Ok(data),
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(%hash, "entry not in the front store, trying the back store");
            }
            Err(err) => {
                tracing::warn!(%hash, %err, "front store read failed, trying the back store");
            }
        }
        self.back.get_by_hash(hash).await
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        let front = self.front.expiration_policy();
        let back = self.back.expiration_policy();
        if front == back {
            front
        } else {
            ExpirationPolicy::MixedTimeout
        }
    }
}

#[async_trait]
impl<F: StorageService, B: StorageService> StorageService for ChainedStorageService<F, B> {
    async fn put(&self, data: &[u8], timeout: u64) -> StorageResult<()> {
        self.back.put(data, timeout).await?;
        if let Err(err) = self.front.put(data, timeout).await {
            tracing::warn!(%err, "entry stored in the back store but the front store write failed");
        }
        Ok(())
    }

    async fn sync(&self) -> StorageResult<()> {
        self.front.sync().await?;
        self.back.sync().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.front.close().await?;
        self.back.close().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.front.health_check().await?;
        self.back.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use meridian_da_primitives::hash::tree_hash;

    use super::*;
    use crate::memory::MemoryStorageService;

    /// Memory store reporting an arbitrary expiration policy.
    struct PolicyOverride {
        inner: MemoryStorageService,
        policy: ExpirationPolicy,
    }

    impl PolicyOverride {
        fn new(policy: ExpirationPolicy) -> Self {
            Self {
                inner: MemoryStorageService::new(),
                policy,
            }
        }
    }

    impl fmt::Debug for PolicyOverride {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("PolicyOverride").finish()
        }
    }

    #[async_trait]
    impl StorageReader for PolicyOverride {
        async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>> {
            self.inner.get_by_hash(hash).await
        }

        fn expiration_policy(&self) -> ExpirationPolicy {
            self.policy
        }
    }

    #[async_trait]
    impl StorageService for PolicyOverride {
        async fn put(&self, data: &[u8], timeout: u64) -> StorageResult<()> {
            self.inner.put(data, timeout).await
        }

        async fn sync(&self) -> StorageResult<()> {
            self.inner.sync().await
        }

        async fn close(&self) -> StorageResult<()> {
            self.inner.close().await
        }

        async fn health_check(&self) -> StorageResult<()> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn put_lands_in_both_stores() {
        let chain = ChainedStorageService::new(
            MemoryStorageService::new(),
            MemoryStorageService::new(),
        );
        let data = vec![0xaa; 30];
        chain.put(&data, 0).await.unwrap();
        let hash = tree_hash(&data);
        assert_eq!(chain.front.get_by_hash(hash).await.unwrap(), data);
        assert_eq!(chain.back.get_by_hash(hash).await.unwrap(), data);
    }

    #[tokio::test]
    async fn front_miss_falls_back() {
        let front = MemoryStorageService::new();
        let back = MemoryStorageService::new();
        let data = vec![0xbb; 30];
        back.put(&data, 0).await.unwrap();

        let chain = ChainedStorageService::new(front, back);
        assert_eq!(chain.get_by_hash(tree_hash(&data)).await.unwrap(), data);
    }

    #[tokio::test]
    async fn matching_policies_pass_through() {
        let chain = ChainedStorageService::new(
            MemoryStorageService::new(),
            MemoryStorageService::new(),
        );
        assert_eq!(chain.expiration_policy(), ExpirationPolicy::KeepForever);
    }

    #[tokio::test]
    async fn differing_policies_report_mixed() {
        let chain = ChainedStorageService::new(
            PolicyOverride::new(ExpirationPolicy::DiscardAfterDataTimeout),
            PolicyOverride::new(ExpirationPolicy::KeepForever),
        );
        assert_eq!(chain.expiration_policy(), ExpirationPolicy::MixedTimeout);
    }
}

//! Storage backends for DA payloads.
//!
//! Every backend speaks the same small [`StorageService`] contract over
//! content-addressed byte blobs keyed by tree hash. Backends compose:
//! [`SignedRedisCache`] wraps any base service with an HMAC-authenticated
//! write-through cache, and [`ChainedStorageService`] pairs a front and a
//! back store with read-through fallback.

use std::fmt;

use async_trait::async_trait;
use meridian_da_primitives::BlobHash;
use thiserror::Error;

pub mod chained;
pub mod local_file;
pub mod memory;
mod metrics;
pub mod redis_cache;

pub use self::{
    chained::ChainedStorageService, local_file::LocalFileStorageService,
    memory::MemoryStorageService, redis_cache::SignedRedisCache,
};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no record found for {0}")]
    NotFound(BlobHash),
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("cached entry for {0} failed authentication")]
    CacheAuth(BlobHash),
    #[error("transport: {0:#}")]
    Transport(#[from] anyhow::Error),
}

/// What a backend promises about how long entries outlive their write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    KeepForever,
    DiscardAfterArchiveTimeout,
    DiscardAfterDataTimeout,
    MixedTimeout,
    DiscardImmediately,
}

impl fmt::Display for ExpirationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KeepForever => "KeepForever",
            Self::DiscardAfterArchiveTimeout => "DiscardAfterArchiveTimeout",
            Self::DiscardAfterDataTimeout => "DiscardAfterDataTimeout",
            Self::MixedTimeout => "MixedTimeout",
            Self::DiscardImmediately => "DiscardImmediately",
        };
        f.write_str(name)
    }
}

/// The read side of a storage backend. The batch recovery pipeline borrows
/// only this.
#[async_trait]
pub trait StorageReader: fmt::Debug + Send + Sync {
    async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>>;

    fn expiration_policy(&self) -> ExpirationPolicy;
}

/// Full storage backend contract.
#[async_trait]
pub trait StorageService: StorageReader {
    /// Stores `data` under its tree hash. `timeout` is the UNIX timestamp
    /// until which the entry must stay retrievable; backends with a
    /// [`ExpirationPolicy::KeepForever`] policy may ignore it.
    async fn put(&self, data: &[u8], timeout: u64) -> StorageResult<()>;

    /// Flushes buffered writes to durable storage.
    async fn sync(&self) -> StorageResult<()>;

    /// Releases backend resources. Layered services close their own
    /// resources before delegating.
    async fn close(&self) -> StorageResult<()>;

    async fn health_check(&self) -> StorageResult<()>;
}

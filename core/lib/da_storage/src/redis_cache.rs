//! HMAC-authenticated write-through cache in front of a base storage
//! service.
//!
//! Entries live under the raw 32-byte tree hash and hold
//! `payload || hmac_keccak256(signing_key, payload)`; the trailing
//! [`TAG_LEN`] bytes are the tag. The cache is best effort: write and read
//! failures degrade to the base store, and a tag mismatch is treated as a
//! miss after being reported. The lookup key is the content hash, so a
//! correctly tagged entry can never be stale.

use std::{fmt, time::Duration};

use anyhow::Context as _;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use meridian_config::DaCacheConfig;
use meridian_da_primitives::{hash::tree_hash, BlobHash};
use sha3::Keccak256;
use tokio::sync::Mutex;

use crate::{
    metrics::METRICS, ExpirationPolicy, StorageError, StorageReader, StorageResult, StorageService,
};

type HmacKeccak256 = Hmac<Keccak256>;

/// Length of the authentication tag appended to every cached value.
pub const TAG_LEN: usize = 32;

/// The subset of Redis the cache uses. Factored out so the tag and
/// fallthrough logic can be exercised against an in-memory fake.
#[async_trait]
pub(crate) trait CacheConnection: fmt::Debug + Send + Sync {
    async fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>>;
    async fn set_ex(&self, key: &[u8], value: &[u8], expiration: Duration) -> anyhow::Result<()>;
    async fn ping(&self) -> anyhow::Result<()>;
    fn clone_boxed(&self) -> Box<dyn CacheConnection>;
}

#[derive(Clone)]
struct RedisConnection {
    manager: redis::aio::ConnectionManager,
}

impl fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnection").finish()
    }
}

#[async_trait]
impl CacheConnection for RedisConnection {
    async fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = redis::AsyncCommands::get(&mut conn, key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &[u8], value: &[u8], expiration: Duration) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let () = redis::AsyncCommands::set_ex(&mut conn, key, value, expiration.as_secs()).await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn clone_boxed(&self) -> Box<dyn CacheConnection> {
        Box::new(self.clone())
    }
}

/// A [`StorageService`] layering an authenticated Redis cache over `base`.
pub struct SignedRedisCache<S> {
    base: S,
    connection: Mutex<Option<Box<dyn CacheConnection>>>,
    signing_key: [u8; 32],
    expiration: Duration,
}

impl<S: StorageService> SignedRedisCache<S> {
    pub async fn new(config: &DaCacheConfig, base: S) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.enable,
            "signed cache constructed while disabled in config"
        );
        let signing_key = config.signing_key()?;
        let client = redis::Client::open(config.url()?).context("invalid Redis url")?;
        let manager = client
            .get_connection_manager()
            .await
            .context("cannot connect to Redis")?;
        Ok(Self::with_connection(
            Box::new(RedisConnection { manager }),
            signing_key,
            config.expiration(),
            base,
        ))
    }

    pub(crate) fn with_connection(
        connection: Box<dyn CacheConnection>,
        signing_key: [u8; 32],
        expiration: Duration,
        base: S,
    ) -> Self {
        Self {
            base,
            connection: Mutex::new(Some(connection)),
            signing_key,
            expiration,
        }
    }

    fn keyed_mac(&self) -> HmacKeccak256 {
        HmacKeccak256::new_from_slice(&self.signing_key).expect("HMAC accepts keys of any length")
    }

    /// `data || tag`, built by appending the tag to a single buffer.
    fn signed_value(&self, data: &[u8]) -> Vec<u8> {
        let mut value = Vec::with_capacity(data.len() + TAG_LEN);
        value.extend_from_slice(data);
        let mut mac = self.keyed_mac();
        mac.update(&value);
        let tag = mac.finalize().into_bytes();
        value.extend_from_slice(&tag);
        value
    }

    async fn connection(&self) -> Option<Box<dyn CacheConnection>> {
        self.connection
            .lock()
            .await
            .as_ref()
            .map(|conn| conn.clone_boxed())
    }

    async fn cache_get(&self, hash: BlobHash) -> StorageResult<Option<Vec<u8>>> {
        let Some(connection) = self.connection().await else {
            return Ok(None);
        };
        let Some(mut value) = connection.get(&hash.0).await.map_err(StorageError::Transport)?
        else {
            return Ok(None);
        };
        if value.len() < TAG_LEN {
            return Err(StorageError::CacheAuth(hash));
        }
        let payload_len = value.len() - TAG_LEN;
        let mut mac = self.keyed_mac();
        mac.update(&value[..payload_len]);
        if mac.verify_slice(&value[payload_len..]).is_err() {
            return Err(StorageError::CacheAuth(hash));
        }
        value.truncate(payload_len);
        Ok(Some(value))
    }

    /// Refreshes the entry in the background; failures only affect hit rate.
    async fn refresh_entry(&self, hash: BlobHash, data: &[u8]) {
        let Some(connection) = self.connection().await else {
            return;
        };
        let value = self.signed_value(data);
        let expiration = self.expiration;
        tokio::spawn(async move {
            if let Err(err) = connection.set_ex(&hash.0, &value, expiration).await {
                tracing::debug!(%hash, %err, "failed to refresh cache entry");
            }
        });
    }
}

impl<S: fmt::Debug> fmt::Debug for SignedRedisCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRedisCache")
            .field("base", &self.base)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[async_trait]
impl<S: StorageService> StorageReader for SignedRedisCache<S> {
    async fn get_by_hash(&self, hash: BlobHash) -> StorageResult<Vec<u8>> {
        match self.cache_get(hash).await {
            Ok(Some(value)) => {
                METRICS.hits.inc();
                return Ok(value);
            }
            Ok(None) => {
                METRICS.misses.inc();
            }
            Err(err @ StorageError::CacheAuth(_)) => {
                METRICS.auth_failures.inc();
                tracing::error!(%hash, %err, "cached entry failed authentication, serving from the base store");
            }
            Err(err) => {
                METRICS.misses.inc();
                tracing::warn!(%hash, %err, "cache read failed, serving from the base store");
            }
        }

        let data = self.base.get_by_hash(hash).await?;
        self.refresh_entry(hash, &data).await;
        Ok(data)
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        self.base.expiration_policy()
    }
}

#[async_trait]
impl<S: StorageService> StorageService for SignedRedisCache<S> {
    async fn put(&self, data: &[u8], timeout: u64) -> StorageResult<()> {
        self.base.put(data, timeout).await?;

        // The write is committed once the base store has it; a cache write
        // failure only costs future hits.
        let hash = tree_hash(data);
        let value = self.signed_value(data);
        if let Some(connection) = self.connection().await {
            if let Err(err) = connection.set_ex(&hash.0, &value, self.expiration).await {
                METRICS.write_errors.inc();
                tracing::error!(%hash, %err, "payload stored but cache write failed");
            }
        }
        Ok(())
    }

    async fn sync(&self) -> StorageResult<()> {
        self.base.sync().await
    }

    async fn close(&self) -> StorageResult<()> {
        // Dropping the manager closes the Redis side; then the base.
        self.connection.lock().await.take();
        self.base.close().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        if let Some(connection) = self.connection().await {
            if let Err(err) = connection.ping().await {
                tracing::warn!(%err, "cache ping failed; entries will be served from the base store");
            }
        }
        self.base.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex as StdMutex,
        },
    };

    use assert_matches::assert_matches;
    use meridian_da_primitives::hash::keccak256;

    use super::*;
    use crate::memory::MemoryStorageService;

    #[derive(Debug, Clone, Default)]
    struct FakeConnection {
        entries: Arc<StdMutex<HashMap<Vec<u8>, Vec<u8>>>>,
        fail_writes: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CacheConnection for FakeConnection {
        async fn get(&self, key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_ex(
            &self,
            key: &[u8],
            value: &[u8],
            _expiration: Duration,
        ) -> anyhow::Result<()> {
            if self.fail_writes.load(Ordering::Relaxed) {
                anyhow::bail!("injected write failure");
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn clone_boxed(&self) -> Box<dyn CacheConnection> {
            Box::new(self.clone())
        }
    }

    const SIGNING_KEY: [u8; 32] = [0x11; 32];

    fn cache_over(
        connection: &FakeConnection,
        base: MemoryStorageService,
    ) -> SignedRedisCache<MemoryStorageService> {
        SignedRedisCache::with_connection(
            Box::new(connection.clone()),
            SIGNING_KEY,
            Duration::from_secs(60),
            base,
        )
    }

    async fn wait_for_entry(connection: &FakeConnection, key: &[u8], expected: &[u8]) {
        for _ in 0..100 {
            if connection.entries.lock().unwrap().get(key).map(Vec::as_slice) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache entry was not refreshed");
    }

    #[tokio::test]
    async fn put_writes_through_with_a_tag() {
        let connection = FakeConnection::default();
        let cache = cache_over(&connection, MemoryStorageService::new());
        let data = vec![0xab; 100];
        cache.put(&data, 0).await.unwrap();

        let hash = tree_hash(&data);
        // Base store has the raw payload.
        assert_eq!(cache.base.get_by_hash(hash).await.unwrap(), data);
        // Cache holds payload || tag under the raw hash bytes.
        let cached = connection.entries.lock().unwrap()[hash.0.as_slice()].clone();
        assert_eq!(cached.len(), data.len() + TAG_LEN);
        assert_eq!(&cached[..data.len()], &data);
    }

    #[tokio::test]
    async fn hits_are_served_without_the_base_store() {
        let connection = FakeConnection::default();
        let data = vec![0xcd; 50];
        let hash = tree_hash(&data);
        {
            let cache = cache_over(&connection, MemoryStorageService::new());
            cache.put(&data, 0).await.unwrap();
        }

        // A fresh cache over an *empty* base store still serves the entry.
        let cache = cache_over(&connection, MemoryStorageService::new());
        assert_eq!(cache.get_by_hash(hash).await.unwrap(), data);
    }

    #[tokio::test]
    async fn tampered_entry_falls_through_and_is_repaired() {
        let connection = FakeConnection::default();
        let base = MemoryStorageService::new();
        let data = vec![0xee; 64];
        base.put(&data, 0).await.unwrap();
        let hash = tree_hash(&data);

        let cache = cache_over(&connection, base);
        let mut tampered = data.clone();
        tampered.extend_from_slice(&[0u8; TAG_LEN]);
        connection
            .entries
            .lock()
            .unwrap()
            .insert(hash.0.to_vec(), tampered);

        assert_eq!(cache.get_by_hash(hash).await.unwrap(), data);

        // The entry is refreshed in the background with a correct tag.
        let expected = cache.signed_value(&data);
        wait_for_entry(&connection, &hash.0, &expected).await;
    }

    #[tokio::test]
    async fn truncated_entry_counts_as_auth_failure() {
        let connection = FakeConnection::default();
        let base = MemoryStorageService::new();
        let data = vec![0x77; 16];
        base.put(&data, 0).await.unwrap();
        let hash = tree_hash(&data);

        let cache = cache_over(&connection, base);
        connection
            .entries
            .lock()
            .unwrap()
            .insert(hash.0.to_vec(), vec![1, 2, 3]);
        assert_matches!(cache.cache_get(hash).await, Err(StorageError::CacheAuth(_)));
        // The public read path still serves the payload.
        assert_eq!(cache.get_by_hash(hash).await.unwrap(), data);
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_the_put() {
        let connection = FakeConnection::default();
        connection.fail_writes.store(true, Ordering::Relaxed);
        let cache = cache_over(&connection, MemoryStorageService::new());
        let data = vec![0x99; 10];
        cache.put(&data, 0).await.unwrap();
        assert_eq!(cache.base.get_by_hash(tree_hash(&data)).await.unwrap(), data);
        assert!(connection.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn base_misses_refresh_the_cache() {
        let connection = FakeConnection::default();
        let base = MemoryStorageService::new();
        let data = vec![0x31; 200];
        base.put(&data, 0).await.unwrap();
        let hash = tree_hash(&data);

        let cache = cache_over(&connection, base);
        assert_eq!(cache.get_by_hash(hash).await.unwrap(), data);
        let expected = cache.signed_value(&data);
        wait_for_entry(&connection, &hash.0, &expected).await;
    }

    #[tokio::test]
    async fn closed_cache_degrades_to_the_base_store() {
        let connection = FakeConnection::default();
        let base = MemoryStorageService::new();
        let data = vec![0x42; 8];
        base.put(&data, 0).await.unwrap();
        let hash = tree_hash(&data);

        let cache = cache_over(&connection, base);
        cache.close().await.unwrap();
        assert_eq!(cache.get_by_hash(hash).await.unwrap(), data);
        cache.put(&[1, 2, 3], 0).await.unwrap();
        assert!(connection.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_entry_propagates_not_found() {
        let connection = FakeConnection::default();
        let cache = cache_over(&connection, MemoryStorageService::new());
        let missing = keccak256(b"nowhere");
        assert_matches!(
            cache.get_by_hash(missing).await,
            Err(StorageError::NotFound(hash)) if hash == missing
        );
    }
}

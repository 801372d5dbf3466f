use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

/// Default TTL for cached entries.
pub const DEFAULT_CACHE_EXPIRATION_SEC: u64 = 3_600;

/// Configuration of the signed Redis cache fronting the DA store.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DaCacheConfig {
    /// Enables the cache. Off by default.
    #[serde(default)]
    pub enable: bool,

    /// Redis connection URL. Required when the cache is enabled.
    pub url: Option<String>,

    /// TTL in seconds applied to every cached entry.
    pub expiration_sec: Option<u64>,

    /// Hex-encoded 32-byte HMAC signing key. Required when the cache is
    /// enabled.
    pub key_config: Option<String>,
}

impl DaCacheConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_sec.unwrap_or(DEFAULT_CACHE_EXPIRATION_SEC))
    }

    pub fn url(&self) -> anyhow::Result<&str> {
        self.url
            .as_deref()
            .context("signed cache is enabled but no Redis url is configured")
    }

    /// Decodes the signing key, insisting on exactly 32 bytes of hex.
    pub fn signing_key(&self) -> anyhow::Result<[u8; 32]> {
        let key_config = self
            .key_config
            .as_deref()
            .context("signed cache is enabled but no signing key is configured")?;
        let bytes = hex::decode(key_config).context("cache signing key is not valid hex")?;
        bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "cache signing key must decode to exactly 32 bytes, got {}",
                bytes.len()
            )
        })
    }

    /// Creates a config object suitable for use in unit tests.
    pub fn for_tests() -> DaCacheConfig {
        Self {
            enable: true,
            url: Some("redis://127.0.0.1:6379".into()),
            expiration_sec: Some(600),
            key_config: Some(
                "27c5cebe1cbbb6b8a40900868a0a1d7cbcacbfca3d2b3e5b3b985b24e5b9bdce".into(),
            ),
        }
    }
}

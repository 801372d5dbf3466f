//! Hash primitives shared by the Meridian data availability stack.
//!
//! Every payload stored by the DA committee is content-addressed by a
//! 32-byte [`BlobHash`]. Two hashing schemes are in use: the legacy flat
//! Keccak-256 over the whole payload, and the chunked tree hash of
//! [`hash::tree_hash`] that replaced it. The [`hash`] module also provides
//! the deterministic bridge between the two, used when reading entries
//! written before the migration.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod hash;

/// Byte length of a [`BlobHash`].
pub const HASH_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum HashParseError {
    #[error("expected {HASH_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A 32-byte content address.
///
/// The producing scheme (flat vs. tree) is not part of the value; callers
/// track it out of band, usually via the certificate version.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlobHash(pub [u8; HASH_LEN]);

impl BlobHash {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, HashParseError> {
        let bytes: [u8; HASH_LEN] = slice
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(slice.len()))?;
        Ok(Self(bytes))
    }

    pub fn repeat_byte(byte: u8) -> Self {
        Self([byte; HASH_LEN])
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHash({self})")
    }
}

impl From<[u8; HASH_LEN]> for BlobHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for BlobHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for BlobHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

// Serialized as the `0x`-prefixed hex string of the `Display` form.
impl Serialize for BlobHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlobHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

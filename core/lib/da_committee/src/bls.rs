//! Thin wrapper around `blst` in the min-pk configuration: public keys on
//! G1 (48 bytes compressed), signatures on G2 (96 bytes compressed).
//!
//! The wrapper keeps the compressed encoding alongside the parsed point so
//! keyset serialization re-emits exactly the bytes it was given.

use std::fmt;

use blst::{min_pk, BLST_ERROR};
use thiserror::Error;

/// Ciphersuite domain separation tag. Part of the wire contract.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Compressed G1 public key length.
pub const PUBLIC_KEY_LEN: usize = 48;
/// Compressed G2 signature length.
pub const SIGNATURE_LEN: usize = 96;

pub type BlsResult<T> = Result<T, BlsError>;

#[derive(Debug, Error)]
pub enum BlsError {
    #[error("public key must be {PUBLIC_KEY_LEN} bytes, got {0}")]
    InvalidPublicKeyLength(usize),
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("bls library rejected the input: {0:?}")]
    Library(BLST_ERROR),
}

impl From<BLST_ERROR> for BlsError {
    fn from(err: BLST_ERROR) -> Self {
        Self::Library(err)
    }
}

/// A committee member's public key.
#[derive(Clone)]
pub struct BlsPublicKey {
    point: min_pk::PublicKey,
    bytes: [u8; PUBLIC_KEY_LEN],
}

impl BlsPublicKey {
    /// Parses a compressed public key.
    ///
    /// With `validate` set the point is subgroup-checked and rejected if it
    /// is the identity; callers deserializing an untrusted keyset must pass
    /// `true`. Replay paths that already verified the keyset hash pass
    /// `false` and skip the subgroup check.
    pub fn from_bytes(bytes: &[u8], validate: bool) -> BlsResult<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| BlsError::InvalidPublicKeyLength(bytes.len()))?;
        let point = if validate {
            min_pk::PublicKey::key_validate(&bytes)?
        } else {
            min_pk::PublicKey::from_bytes(&bytes)?
        };
        Ok(Self { point, bytes })
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.bytes
    }

    pub(crate) fn point(&self) -> &min_pk::PublicKey {
        &self.point
    }

    pub(crate) fn from_point(point: min_pk::PublicKey) -> Self {
        let bytes = point.to_bytes();
        Self { point, bytes }
    }
}

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for BlsPublicKey {}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey(0x{})", hex::encode(self.bytes))
    }
}

/// An aggregate (or single) committee signature.
#[derive(Clone)]
pub struct BlsSignature {
    point: min_pk::Signature,
    bytes: [u8; SIGNATURE_LEN],
}

impl BlsSignature {
    /// Parses a compressed signature. Group membership is checked at
    /// verification time, not here.
    pub fn from_bytes(bytes: &[u8]) -> BlsResult<Self> {
        let bytes: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| BlsError::InvalidSignatureLength(bytes.len()))?;
        let point = min_pk::Signature::from_bytes(&bytes)?;
        Ok(Self { point, bytes })
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.bytes
    }

    pub(crate) fn from_point(point: min_pk::Signature) -> Self {
        let bytes = point.to_bytes();
        Self { point, bytes }
    }
}

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for BlsSignature {}

impl fmt::Debug for BlsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSignature(0x{})", hex::encode(self.bytes))
    }
}

/// Aggregates `pub_keys` and verifies `signature` over `message` against the
/// aggregate. Returns `Ok(false)` on a well-formed but wrong signature and
/// `Err` when the library rejects an input (empty key list, point not in the
/// group).
pub fn verify_against_aggregate(
    pub_keys: &[&BlsPublicKey],
    message: &[u8],
    signature: &BlsSignature,
) -> BlsResult<bool> {
    let points: Vec<&min_pk::PublicKey> = pub_keys.iter().map(|pk| pk.point()).collect();
    let aggregate = min_pk::AggregatePublicKey::aggregate(&points, false)?;
    let aggregate = aggregate.to_public_key();
    let err = signature
        .point
        .verify(true, message, DST, &[], &aggregate, false);
    Ok(err == BLST_ERROR::BLST_SUCCESS)
}

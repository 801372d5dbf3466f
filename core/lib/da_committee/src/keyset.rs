//! Committee descriptor codec.
//!
//! Wire format, all integers big-endian:
//!
//! ```text
//! u64   assumed_honest
//! u64   num_keys            (at most 64)
//! repeat num_keys:
//!   u16      pk_len
//!   [pk_len] pk_bytes
//! ```
//!
//! A keyset is immutable once built and is referenced by the tree hash of
//! this serialization. The signers mask of a certificate indexes into
//! `pub_keys` in wire order, which caps the committee at 64 members.

use meridian_da_primitives::{
    hash::{tree_hash, BIN_SIZE},
    BlobHash,
};

use crate::{
    bls::BlsPublicKey,
    errors::{CommitteeError, CommitteeResult},
};

/// The signers mask is a u64 bitmap, so a keyset can never hold more keys.
pub const MAX_KEYSET_KEYS: u64 = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyset {
    /// Minimum number of members assumed not to collude. A certificate is
    /// acceptable iff its non-signer count stays below this.
    pub assumed_honest: u64,
    /// Committee members in mask-bit order.
    pub pub_keys: Vec<BlsPublicKey>,
}

impl Keyset {
    pub fn new(assumed_honest: u64, pub_keys: Vec<BlsPublicKey>) -> CommitteeResult<Self> {
        if pub_keys.len() as u64 > MAX_KEYSET_KEYS {
            return Err(CommitteeError::TooManyKeys(pub_keys.len() as u64));
        }
        Ok(Self {
            assumed_honest,
            pub_keys,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let keys_len: usize = self.pub_keys.iter().map(|pk| 2 + pk.to_bytes().len()).sum();
        let mut out = Vec::with_capacity(16 + keys_len);
        out.extend_from_slice(&self.assumed_honest.to_be_bytes());
        out.extend_from_slice(&(self.pub_keys.len() as u64).to_be_bytes());
        for pk in &self.pub_keys {
            let bytes = pk.to_bytes();
            out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        out
    }

    /// Parses a serialized keyset.
    ///
    /// `validate_keys` selects the expensive subgroup check on each public
    /// key; pass `true` whenever the bytes did not arrive through a
    /// hash-verified channel.
    pub fn deserialize(bytes: &[u8], validate_keys: bool) -> CommitteeResult<Self> {
        let mut reader = ByteReader::new(bytes, "keyset");
        let assumed_honest = reader.read_u64()?;
        let num_keys = reader.read_u64()?;
        if num_keys > MAX_KEYSET_KEYS {
            return Err(CommitteeError::TooManyKeys(num_keys));
        }

        let mut pub_keys = Vec::with_capacity(num_keys as usize);
        for _ in 0..num_keys {
            let pk_len = reader.read_u16()? as usize;
            let pk_bytes = reader.read_bytes(pk_len)?;
            pub_keys.push(BlsPublicKey::from_bytes(pk_bytes, validate_keys)?);
        }
        if !reader.is_empty() {
            return Err(CommitteeError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            assumed_honest,
            pub_keys,
        })
    }

    /// Content hash of the keyset: the tree hash of its serialization.
    /// Serialized keysets must fit in a single tree bin.
    pub fn hash(&self) -> CommitteeResult<BlobHash> {
        let bytes = self.serialize();
        if bytes.len() > BIN_SIZE {
            return Err(CommitteeError::KeysetTooLarge(bytes.len()));
        }
        Ok(tree_hash(&bytes))
    }
}

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    what: &'static str,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8], what: &'static str) -> Self {
        Self { bytes, what }
    }

    pub fn read_bytes(&mut self, len: usize) -> CommitteeResult<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(CommitteeError::Truncated {
                what: self.what,
                needed: len,
                got: self.bytes.len(),
            });
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> CommitteeResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> CommitteeResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u64(&mut self) -> CommitteeResult<u64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_hash(&mut self) -> CommitteeResult<BlobHash> {
        let bytes = self.read_bytes(32)?;
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Ok(BlobHash(buf))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

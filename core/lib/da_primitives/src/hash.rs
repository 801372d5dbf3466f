//! Flat and tree hashing over DA payloads.
//!
//! The tree hash chunks its input into bins of [`BIN_SIZE`] bytes, hashes
//! each bin as a domain-tagged leaf, and pair-reduces the resulting level
//! until a single root remains. An odd trailing node is promoted to the next
//! level unchanged. Both hash functions and the domain tags are part of the
//! cross-implementation wire contract and must never change.

use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;

use crate::{BlobHash, HASH_LEN};

/// Chunk size of the tree hash. Also the upper bound on a serialized keyset.
pub const BIN_SIZE: usize = 64 * 1024;

/// Domain tag prepended to leaf preimages.
pub const LEAF_TAG: u8 = 0xfe;
/// Domain tag prepended to internal-node preimages.
pub const INTERNAL_TAG: u8 = 0xff;

/// Plain Keccak-256 over the full input; the legacy flat scheme.
pub fn keccak256(data: &[u8]) -> BlobHash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    BlobHash(hasher.finalize().into())
}

/// Tree hash of `data` under the chunked leaf/internal scheme.
///
/// A single-bin input yields its leaf hash directly; the empty input is
/// hashed as one empty leaf. Note that even for inputs below [`BIN_SIZE`]
/// the result differs from [`keccak256`] because of the leaf tag.
pub fn tree_hash(data: &[u8]) -> BlobHash {
    hash_tree(data, &mut None)
}

/// Same traversal as [`tree_hash`], additionally invoking `record` with
/// `(node_hash, node_preimage)` for every leaf and internal node visited.
///
/// The recorded set is exactly what a replaying verifier needs to walk from
/// the root back down to the payload bins.
pub fn tree_hash_recorded(data: &[u8], record: &mut dyn FnMut(BlobHash, &[u8])) -> BlobHash {
    hash_tree(data, &mut Some(record))
}

/// Constant-time check that `data` tree-hashes to `hash`.
pub fn valid_tree_hash(hash: &BlobHash, data: &[u8]) -> bool {
    tree_hash(data).0.ct_eq(&hash.0).into()
}

/// Constant-time check that `data` flat-hashes to `hash`.
pub fn valid_flat_hash(hash: &BlobHash, data: &[u8]) -> bool {
    keccak256(data).0.ct_eq(&hash.0).into()
}

/// Migration bridge: the tree hash of the leaf whose 32-byte content is the
/// legacy flat hash itself. Entries written under a flat hash are re-keyed
/// under this value by cache and store layers.
pub fn flat_to_tree(flat: &BlobHash) -> BlobHash {
    leaf_hash(&flat.0, &mut None)
}

/// The preimage of [`flat_to_tree`], `LEAF_TAG || flat`.
pub fn flat_to_tree_leaf(flat: &BlobHash) -> [u8; HASH_LEN + 1] {
    let mut leaf = [0u8; HASH_LEN + 1];
    leaf[0] = LEAF_TAG;
    leaf[1..].copy_from_slice(&flat.0);
    leaf
}

type Recorder<'a> = Option<&'a mut dyn FnMut(BlobHash, &[u8])>;

fn leaf_hash(bin: &[u8], record: &mut Recorder<'_>) -> BlobHash {
    let mut hasher = Keccak256::new();
    hasher.update([LEAF_TAG]);
    hasher.update(bin);
    let hash = BlobHash(hasher.finalize().into());
    if let Some(record) = record.as_mut() {
        let mut preimage = Vec::with_capacity(1 + bin.len());
        preimage.push(LEAF_TAG);
        preimage.extend_from_slice(bin);
        record(hash, &preimage);
    }
    hash
}

fn internal_hash(left: &BlobHash, right: &BlobHash, record: &mut Recorder<'_>) -> BlobHash {
    let mut preimage = [0u8; 1 + 2 * HASH_LEN];
    preimage[0] = INTERNAL_TAG;
    preimage[1..=HASH_LEN].copy_from_slice(&left.0);
    preimage[HASH_LEN + 1..].copy_from_slice(&right.0);
    let hash = keccak256(&preimage);
    if let Some(record) = record.as_mut() {
        record(hash, &preimage);
    }
    hash
}

fn hash_tree(data: &[u8], record: &mut Recorder<'_>) -> BlobHash {
    let mut level: Vec<BlobHash> = if data.is_empty() {
        vec![leaf_hash(&[], record)]
    } else {
        data.chunks(BIN_SIZE)
            .map(|bin| leaf_hash(bin, record))
            .collect()
    };

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(internal_hash(left, right, record)),
                [odd] => next.push(*odd),
                _ => unreachable!("chunks(2) yields one- or two-element slices"),
            }
        }
        level = next;
    }
    level[0]
}

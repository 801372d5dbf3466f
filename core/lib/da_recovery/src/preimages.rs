//! Side channel recording `(hash, preimage)` pairs seen during recovery.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use meridian_da_primitives::BlobHash;

/// Hash function a recorded preimage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreimageType {
    Keccak256,
    Sha2_256,
    EthVersionedHash,
}

/// Append-only concurrent map of recorded preimages.
///
/// Clones share the same map, so a recorder can be handed to concurrent
/// batch recoveries. Re-recording an identical entry is a no-op; recording
/// different bytes under the same hash would mean a hash collision or a
/// corrupted caller and brings the process down.
#[derive(Debug, Clone, Default)]
pub struct PreimageRecorder {
    inner: Arc<Mutex<HashMap<BlobHash, (Vec<u8>, PreimageType)>>>,
}

impl PreimageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, hash: BlobHash, preimage: &[u8], preimage_type: PreimageType) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match map.entry(hash) {
            Entry::Occupied(entry) => {
                let (existing, existing_type) = entry.get();
                assert!(
                    existing == preimage && *existing_type == preimage_type,
                    "conflicting preimages recorded for {hash}"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert((preimage.to_vec(), preimage_type));
            }
        }
    }

    pub fn get(&self, hash: &BlobHash) -> Option<(Vec<u8>, PreimageType)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hash)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of every recorded entry.
    pub fn snapshot(&self) -> HashMap<BlobHash, (Vec<u8>, PreimageType)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

//! The batch recovery pipeline.
//!
//! A sequencer message either carries a DA certificate at its tail or it
//! does not concern this subsystem at all. Outcomes are three-way:
//!
//! * [`RecoveryOutcome::Payload`]: the certificate checked out and the
//!   payload was fetched and hash-verified;
//! * [`RecoveryOutcome::NotDaBatch`]: the message does not parse as a DA
//!   batch; the caller sources the batch elsewhere;
//! * [`RecoveryOutcome::Rejected`]: a well-formed certificate this node
//!   must not rely on (unknown version, bad quorum signature, expiring too
//!   soon); the caller falls back to on-chain data.
//!
//! Anything else, such as a store transport failure or a payload that does
//! not match its hash, is a genuine error and halts the caller.

use std::time::Duration;

use meridian_da_committee::{
    certificate::MAX_SUPPORTED_CERT_VERSION, CommitteeError, DaCertificate, Keyset,
};
use meridian_da_primitives::{
    hash::{
        flat_to_tree, flat_to_tree_leaf, tree_hash_recorded, valid_flat_hash, valid_tree_hash,
    },
    BlobHash,
};
use meridian_da_storage::{StorageError, StorageReader};
use thiserror::Error;

use crate::{
    metrics::{SoftSkipLabel, METRICS},
    preimages::{PreimageRecorder, PreimageType},
};

/// Minimum remaining certificate lifetime, measured from the batch's
/// maximum timestamp, for the certificate to be relied on.
pub const MIN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Byte offset of the serialized certificate within a sequencer message.
const CERT_OFFSET: usize = 40;
/// Byte range of the big-endian maximum batch timestamp.
const MAX_TIMESTAMP_OFFSET: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Payload(Vec<u8>),
    NotDaBatch,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The certificate version is newer than this node understands.
    UnsupportedVersion(u8),
    /// The quorum signature did not verify against the keyset, including
    /// the not-enough-signers case.
    InvalidSignature,
    /// The certificate times out less than [`MIN_LIFETIME`] past the
    /// batch's maximum timestamp.
    ExpiresTooSoon,
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("batch {batch_num}: payload does not hash to certificate data hash {data_hash}")]
    HashMismatch { batch_num: u64, data_hash: BlobHash },
    #[error("batch {batch_num}: keyset preimage does not hash to {keyset_hash} named by the certificate")]
    KeysetMismatch { batch_num: u64, keyset_hash: BlobHash },
    #[error("batch {batch_num}: invalid keyset under {keyset_hash}: {source}")]
    Keyset {
        batch_num: u64,
        keyset_hash: BlobHash,
        #[source]
        source: CommitteeError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn soft_skip(reason: &'static str) {
    let label = SoftSkipLabel {
        reason: reason.into(),
    };
    METRICS.soft_skips[&label].inc();
}

/// Recovers the DA payload referenced by `sequencer_msg`, if any.
///
/// `reader` is the hash-addressed store holding both keysets and payloads.
/// With `validate_seq_msg` unset the keyset's public keys get the full
/// subgroup check on deserialization; a caller that independently validates
/// sequencer messages sets it and skips that cost. When a `preimages`
/// recorder is supplied, every keccak preimage a replaying verifier needs is
/// recorded on the way.
pub async fn recover_payload_from_batch(
    batch_num: u64,
    sequencer_msg: &[u8],
    reader: &dyn StorageReader,
    preimages: Option<&PreimageRecorder>,
    validate_seq_msg: bool,
) -> Result<RecoveryOutcome, RecoveryError> {
    if sequencer_msg.len() < CERT_OFFSET {
        tracing::error!(
            batch_num,
            len = sequencer_msg.len(),
            "sequencer message too short to carry a DA certificate"
        );
        soft_skip("malformed_certificate");
        return Ok(RecoveryOutcome::NotDaBatch);
    }
    let cert = match DaCertificate::deserialize(&sequencer_msg[CERT_OFFSET..]) {
        Ok(cert) => cert,
        Err(err) => {
            tracing::error!(batch_num, %err, "could not deserialize DA certificate from sequencer message");
            soft_skip("malformed_certificate");
            return Ok(RecoveryOutcome::NotDaBatch);
        }
    };

    if cert.version > MAX_SUPPORTED_CERT_VERSION {
        tracing::error!(
            batch_num,
            version = cert.version,
            "certificate version is newer than this node understands; upgrade required"
        );
        soft_skip("unsupported_version");
        return Ok(RecoveryOutcome::Rejected(RejectReason::UnsupportedVersion(
            cert.version,
        )));
    }

    let keyset_preimage = reader.get_by_hash(cert.keyset_hash).await?;
    if !valid_tree_hash(&cert.keyset_hash, &keyset_preimage) {
        return Err(RecoveryError::KeysetMismatch {
            batch_num,
            keyset_hash: cert.keyset_hash,
        });
    }
    if let Some(recorder) = preimages {
        recorder.record(cert.keyset_hash, &keyset_preimage, PreimageType::Keccak256);
    }
    let keyset =
        Keyset::deserialize(&keyset_preimage, !validate_seq_msg).map_err(|source| {
            RecoveryError::Keyset {
                batch_num,
                keyset_hash: cert.keyset_hash,
                source,
            }
        })?;

    if let Err(err) = cert.verify_signature(&keyset) {
        tracing::error!(batch_num, %err, keyset_hash = %cert.keyset_hash, "DA certificate failed committee signature verification");
        soft_skip("invalid_signature");
        return Ok(RecoveryOutcome::Rejected(RejectReason::InvalidSignature));
    }

    let mut max_timestamp = [0u8; 8];
    max_timestamp.copy_from_slice(&sequencer_msg[MAX_TIMESTAMP_OFFSET..MAX_TIMESTAMP_OFFSET + 8]);
    let max_timestamp = u64::from_be_bytes(max_timestamp);
    if cert.timeout < max_timestamp.saturating_add(MIN_LIFETIME.as_secs()) {
        tracing::error!(
            batch_num,
            timeout = cert.timeout,
            max_timestamp,
            "certificate expires too soon to be relied on"
        );
        soft_skip("expires_too_soon");
        return Ok(RecoveryOutcome::Rejected(RejectReason::ExpiresTooSoon));
    }

    let lookup_hash = cert.payload_lookup_hash();
    let payload = match reader.get_by_hash(lookup_hash).await {
        Ok(payload) => payload,
        Err(err) if lookup_hash != cert.data_hash => {
            // Migration-era entries can still be keyed under the flat hash.
            tracing::warn!(batch_num, %err, "payload missing under the migrated key, retrying under the legacy flat hash");
            reader.get_by_hash(cert.data_hash).await?
        }
        Err(err) => return Err(err.into()),
    };

    let payload_matches = if cert.version == 0 {
        valid_flat_hash(&cert.data_hash, &payload)
    } else {
        valid_tree_hash(&cert.data_hash, &payload)
    };
    if !payload_matches {
        return Err(RecoveryError::HashMismatch {
            batch_num,
            data_hash: cert.data_hash,
        });
    }

    if let Some(recorder) = preimages {
        if cert.version == 0 {
            recorder.record(cert.data_hash, &payload, PreimageType::Keccak256);
            // The bridge leaf lets the verifier map the migrated storage key
            // back to the flat hash it fetched under.
            let leaf = flat_to_tree_leaf(&cert.data_hash);
            recorder.record(flat_to_tree(&cert.data_hash), &leaf, PreimageType::Keccak256);
        } else {
            tree_hash_recorded(&payload, &mut |hash, preimage| {
                recorder.record(hash, preimage, PreimageType::Keccak256);
            });
        }
    }

    METRICS.recovered_payloads.inc();
    METRICS.recovered_bytes.inc_by(payload.len() as u64);
    Ok(RecoveryOutcome::Payload(payload))
}

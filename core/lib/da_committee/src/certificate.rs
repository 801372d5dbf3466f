//! Data availability certificate codec.
//!
//! Wire format, all integers big-endian:
//!
//! ```text
//! u8    flags          header bit always set; tree bit set iff version != 0
//! [32]  keyset_hash
//! [32]  data_hash
//! u64   timeout
//! u8    version        present only when the tree bit is set
//! u64   signers_mask
//! [96]  bls_signature
//! ```
//!
//! Only `data_hash`, `timeout` and (for versioned certificates) `version`
//! are covered by the signature. The keyset hash is bound by the quorum's
//! out-of-band commitment to the keyset, and the signers mask is an
//! unauthenticated selector; see [`crate::verifier`].

use meridian_da_primitives::{hash::flat_to_tree, BlobHash};

use crate::{
    bls::{BlsSignature, SIGNATURE_LEN},
    errors::{CommitteeError, CommitteeResult},
    keyset::{ByteReader, Keyset},
    verifier::verify_aggregate,
};

/// Flag bit marking a sequencer message tail as a DA certificate.
pub const DA_MESSAGE_HEADER_FLAG: u8 = 0x80;
/// Flag bit marking a certificate whose data hash uses the tree scheme.
pub const TREE_HASH_FLAG: u8 = 0x08;

/// Certificate versions this node understands. Version 0 is the legacy
/// flat-hash era; version 1 hashes payloads with the tree scheme. Anything
/// above is produced by a newer protocol and must be rejected upstream.
pub const MAX_SUPPORTED_CERT_VERSION: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaCertificate {
    /// Content hash of the committee keyset that signed this certificate.
    pub keyset_hash: BlobHash,
    /// Payload hash; flat for version 0, tree for version 1.
    pub data_hash: BlobHash,
    /// UNIX epoch seconds after which the committee may discard the payload.
    pub timeout: u64,
    pub version: u8,
    /// Bit i set iff committee member i contributed to the signature.
    pub signers_mask: u64,
    pub sig: BlsSignature,
}

impl DaCertificate {
    pub fn serialize(&self) -> Vec<u8> {
        let mut flags = DA_MESSAGE_HEADER_FLAG;
        if self.version != 0 {
            flags |= TREE_HASH_FLAG;
        }

        let mut out = Vec::with_capacity(1 + 32 + 32 + 8 + 1 + 8 + SIGNATURE_LEN);
        out.push(flags);
        out.extend_from_slice(&self.keyset_hash.0);
        out.extend_from_slice(&self.data_hash.0);
        out.extend_from_slice(&self.timeout.to_be_bytes());
        if self.version != 0 {
            out.push(self.version);
        }
        out.extend_from_slice(&self.signers_mask.to_be_bytes());
        out.extend_from_slice(&self.sig.to_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> CommitteeResult<Self> {
        let mut reader = ByteReader::new(bytes, "certificate");
        let flags = reader.read_u8()?;
        if flags & DA_MESSAGE_HEADER_FLAG == 0 {
            return Err(CommitteeError::BadHeader(flags));
        }

        let keyset_hash = reader.read_hash()?;
        let data_hash = reader.read_hash()?;
        let timeout = reader.read_u64()?;
        let version = if flags & TREE_HASH_FLAG != 0 {
            reader.read_u8()?
        } else {
            0
        };
        let signers_mask = reader.read_u64()?;
        let sig = BlsSignature::from_bytes(reader.read_bytes(SIGNATURE_LEN)?)?;

        Ok(Self {
            keyset_hash,
            data_hash,
            timeout,
            version,
            signers_mask,
            sig,
        })
    }

    /// The exact byte string the committee signs:
    /// `data_hash || timeout_be || version` (version omitted for legacy
    /// certificates, which predate the field).
    pub fn signable_fields(&self) -> Vec<u8> {
        let mut fields = Vec::with_capacity(32 + 8 + 1);
        fields.extend_from_slice(&self.data_hash.0);
        fields.extend_from_slice(&self.timeout.to_be_bytes());
        if self.version != 0 {
            fields.push(self.version);
        }
        fields
    }

    /// The key the payload lives under in tree-hash-addressed storage.
    ///
    /// Version-0 certificates carry a flat hash; their payloads were
    /// re-keyed under the migration bridge.
    pub fn payload_lookup_hash(&self) -> BlobHash {
        if self.version == 0 {
            flat_to_tree(&self.data_hash)
        } else {
            self.data_hash
        }
    }

    /// Verifies the aggregate signature over [`Self::signable_fields`]
    /// against the members of `keyset` selected by the signers mask.
    pub fn verify_signature(&self, keyset: &Keyset) -> CommitteeResult<()> {
        verify_aggregate(
            keyset,
            self.signers_mask,
            &self.signable_fields(),
            &self.sig,
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::{signed_certificate, test_committee};

    #[test]
    fn round_trips_for_both_versions() {
        let (keyset, signers) = test_committee(3, 1);
        for version in [0u8, 1] {
            let cert = signed_certificate(
                &keyset,
                &signers,
                0b011,
                BlobHash::repeat_byte(0x42),
                1_700_000_000,
                version,
            );
            let restored = DaCertificate::deserialize(&cert.serialize()).unwrap();
            assert_eq!(restored, cert);
        }
    }

    #[test]
    fn flag_byte_encodes_header_and_tree_bits() {
        let (keyset, signers) = test_committee(1, 1);
        let legacy = signed_certificate(&keyset, &signers, 1, BlobHash::default(), 10, 0);
        let tree = signed_certificate(&keyset, &signers, 1, BlobHash::default(), 10, 1);

        let legacy_bytes = legacy.serialize();
        let tree_bytes = tree.serialize();
        assert_eq!(legacy_bytes[0], DA_MESSAGE_HEADER_FLAG);
        assert_eq!(tree_bytes[0], DA_MESSAGE_HEADER_FLAG | TREE_HASH_FLAG);
        // The legacy wire predates the version byte.
        assert_eq!(legacy_bytes.len() + 1, tree_bytes.len());
    }

    #[test]
    fn missing_header_bit_is_rejected() {
        let (keyset, signers) = test_committee(1, 1);
        let mut bytes =
            signed_certificate(&keyset, &signers, 1, BlobHash::default(), 10, 1).serialize();
        bytes[0] &= !DA_MESSAGE_HEADER_FLAG;
        assert_matches!(
            DaCertificate::deserialize(&bytes),
            Err(CommitteeError::BadHeader(_))
        );
    }

    #[test]
    fn truncated_certificate_is_rejected() {
        let (keyset, signers) = test_committee(1, 1);
        let bytes = signed_certificate(&keyset, &signers, 1, BlobHash::default(), 10, 1).serialize();
        for len in [0, 1, 40, bytes.len() - 1] {
            assert_matches!(
                DaCertificate::deserialize(&bytes[..len]),
                Err(_),
                "length {len} must not parse"
            );
        }
    }

    #[test]
    fn signable_fields_cover_version_conditionally() {
        let (keyset, signers) = test_committee(1, 1);
        let hash = BlobHash::repeat_byte(9);
        let legacy = signed_certificate(&keyset, &signers, 1, hash, 77, 0);
        let tree = signed_certificate(&keyset, &signers, 1, hash, 77, 1);
        assert_eq!(legacy.signable_fields().len(), 40);
        assert_eq!(tree.signable_fields().len(), 41);
        assert_eq!(&tree.signable_fields()[..40], &legacy.signable_fields()[..]);
        assert_eq!(tree.signable_fields()[40], 1);
    }

    #[test]
    fn lookup_hash_bridges_legacy_certificates() {
        let (keyset, signers) = test_committee(1, 1);
        let flat = BlobHash::repeat_byte(0x55);
        let legacy = signed_certificate(&keyset, &signers, 1, flat, 10, 0);
        let tree = signed_certificate(&keyset, &signers, 1, flat, 10, 1);
        assert_eq!(legacy.payload_lookup_hash(), flat_to_tree(&flat));
        assert_eq!(tree.payload_lookup_hash(), flat);
    }
}

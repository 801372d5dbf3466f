//! Committee fixtures for tests: deterministic BLS signers and signed
//! certificates. Production committee coordination lives outside this
//! repository; nothing here is reachable from non-test code paths.

use blst::min_pk;
use meridian_da_primitives::BlobHash;

use crate::{
    bls::{BlsPublicKey, BlsSignature, DST},
    certificate::DaCertificate,
    keyset::Keyset,
};

/// A committee member with signing capability.
pub struct TestSigner {
    secret: min_pk::SecretKey,
}

impl TestSigner {
    /// Deterministic signer; the same seed always yields the same key.
    pub fn from_seed(seed: u64) -> Self {
        let mut ikm = [0x5au8; 32];
        ikm[..8].copy_from_slice(&seed.to_be_bytes());
        let secret = min_pk::SecretKey::key_gen(&ikm, &[]).expect("32-byte ikm is valid");
        Self { secret }
    }

    pub fn public(&self) -> BlsPublicKey {
        BlsPublicKey::from_point(self.secret.sk_to_pk())
    }

    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature::from_point(self.secret.sign(message, DST, &[]))
    }
}

/// A keyset of `n` deterministic signers with the given honesty threshold.
pub fn test_committee(n: u64, assumed_honest: u64) -> (Keyset, Vec<TestSigner>) {
    let signers: Vec<_> = (0..n).map(TestSigner::from_seed).collect();
    let keyset = Keyset::new(assumed_honest, signers.iter().map(TestSigner::public).collect())
        .expect("committee fits the keyset limit");
    (keyset, signers)
}

/// Aggregate signature of `message` by the signers selected in `mask`.
pub fn sign_with(signers: &[TestSigner], mask: u64, message: &[u8]) -> BlsSignature {
    let parts: Vec<min_pk::Signature> = signers
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, signer)| signer.secret.sign(message, DST, &[]))
        .collect();
    let refs: Vec<&min_pk::Signature> = parts.iter().collect();
    let aggregate =
        min_pk::AggregateSignature::aggregate(&refs, false).expect("at least one signer selected");
    BlsSignature::from_point(aggregate.to_signature())
}

/// A certificate over `data_hash` signed by the `mask`-selected subset of
/// `signers`.
pub fn signed_certificate(
    keyset: &Keyset,
    signers: &[TestSigner],
    mask: u64,
    data_hash: BlobHash,
    timeout: u64,
    version: u8,
) -> DaCertificate {
    let mut fields = Vec::with_capacity(41);
    fields.extend_from_slice(&data_hash.0);
    fields.extend_from_slice(&timeout.to_be_bytes());
    if version != 0 {
        fields.push(version);
    }
    DaCertificate {
        keyset_hash: keyset.hash().expect("test keyset fits a bin"),
        data_hash,
        timeout,
        version,
        signers_mask: mask,
        sig: sign_with(signers, mask, &fields),
    }
}

//! Aggregate signature verification against a bitmask-selected committee
//! subset.

use crate::{
    bls::{self, BlsSignature},
    errors::{CommitteeError, CommitteeResult},
    keyset::Keyset,
};

/// Verifies `signature` over `message` for the members of `keyset` selected
/// by `signers_mask`.
///
/// The mask is *not* covered by the signature; a byzantine sender can
/// present any mask it likes. That is safe only because the quorum predicate
/// (`non_signers < assumed_honest`) must still hold for whatever subset the
/// mask selects, so excluding honest signers can only make the predicate
/// harder to satisfy. Deployments must set `assumed_honest` accordingly.
pub fn verify_aggregate(
    keyset: &Keyset,
    signers_mask: u64,
    message: &[u8],
    signature: &BlsSignature,
) -> CommitteeResult<()> {
    let num_keys = keyset.pub_keys.len();
    if num_keys < u64::BITS as usize && signers_mask >> num_keys != 0 {
        return Err(CommitteeError::InvalidSignersMask {
            mask: signers_mask,
            num_keys,
        });
    }

    let mut signers = Vec::with_capacity(signers_mask.count_ones() as usize);
    let mut non_signers = 0u64;
    for (i, key) in keyset.pub_keys.iter().enumerate() {
        if signers_mask & (1 << i) != 0 {
            signers.push(key);
        } else {
            non_signers += 1;
        }
    }
    if non_signers >= keyset.assumed_honest {
        return Err(CommitteeError::NotEnoughSigners {
            non_signers,
            assumed_honest: keyset.assumed_honest,
        });
    }

    match bls::verify_against_aggregate(&signers, message, signature) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CommitteeError::BadSignature),
        Err(err) => {
            tracing::warn!(%err, "bls library rejected aggregate verification input");
            Err(CommitteeError::BadSignature)
        }
    }
}

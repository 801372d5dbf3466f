use thiserror::Error;

use crate::bls::BlsError;

pub type CommitteeResult<T> = Result<T, CommitteeError>;

#[derive(Debug, Error)]
pub enum CommitteeError {
    #[error("certificate flag byte {0:#04x} lacks the DA message header bit")]
    BadHeader(u8),
    #[error("{what} truncated: needed {needed} more bytes, {got} left")]
    Truncated {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("keyset declares {0} keys, limit is {limit}", limit = crate::MAX_KEYSET_KEYS)]
    TooManyKeys(u64),
    #[error("{0} trailing bytes after the last keyset entry")]
    TrailingBytes(usize),
    #[error(
        "serialized keyset is {0} bytes, limit is {limit}",
        limit = meridian_da_primitives::hash::BIN_SIZE
    )]
    KeysetTooLarge(usize),
    #[error("signers mask {mask:#018x} selects members beyond the {num_keys}-key committee")]
    InvalidSignersMask { mask: u64, num_keys: usize },
    #[error("{non_signers} non-signers, assumed-honest threshold is {assumed_honest}")]
    NotEnoughSigners {
        non_signers: u64,
        assumed_honest: u64,
    },
    #[error("aggregate signature verification failed")]
    BadSignature,
    #[error(transparent)]
    Bls(#[from] BlsError),
}

//! DA committee primitives: BLS keysets, availability certificates, and
//! aggregate signature verification.
//!
//! A committee is described by a [`Keyset`] (an ordered list of BLS public
//! keys plus the number of members assumed honest) and is referenced
//! everywhere by its content hash. A [`DaCertificate`] commits a quorum of
//! that committee to the availability of one payload hash until a timeout.
//! Both wire formats are bit-exact contracts shared with other
//! implementations; see the codec modules for the layouts.

pub mod bls;
pub mod certificate;
mod errors;
pub mod keyset;
pub mod test_utils;
pub mod verifier;

pub use self::{
    certificate::{DaCertificate, DA_MESSAGE_HEADER_FLAG, TREE_HASH_FLAG},
    errors::{CommitteeError, CommitteeResult},
    keyset::{Keyset, MAX_KEYSET_KEYS},
    verifier::verify_aggregate,
};

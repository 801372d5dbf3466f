//! Recovery of sequencer batch payloads from DA certificates.
//!
//! Given a raw sequencer message, [`recover_payload_from_batch`] parses the
//! trailing certificate, fetches and checks the committee keyset, verifies
//! the aggregate signature and remaining lifetime, and retrieves the payload
//! under the hashing scheme the certificate version selects. Hashes seen
//! along the way can be recorded as [`preimages`] for later replay by a
//! fraud-proof verifier.

mod metrics;
pub mod preimages;
pub mod recover;

pub use self::{
    preimages::{PreimageRecorder, PreimageType},
    recover::{
        recover_payload_from_batch, RecoveryError, RecoveryOutcome, RejectReason, MIN_LIFETIME,
    },
};

use vise::{Counter, EncodeLabelSet, Family, Metrics};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
pub(crate) struct SoftSkipLabel {
    pub reason: String,
}

#[derive(Debug, Metrics)]
#[metrics(prefix = "meridian_da_recovery")]
pub(crate) struct DaRecoveryMetrics {
    /// Payloads successfully recovered from DA certificates.
    pub recovered_payloads: Counter,
    /// Total bytes of recovered payloads.
    pub recovered_bytes: Counter,
    /// Batches skipped without an error, by reason.
    pub soft_skips: Family<SoftSkipLabel, Counter>,
}

#[vise::register]
pub(crate) static METRICS: vise::Global<DaRecoveryMetrics> = vise::Global::new();

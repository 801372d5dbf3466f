use vise::{Counter, Metrics};

#[derive(Debug, Metrics)]
#[metrics(prefix = "meridian_da_storage_cache")]
pub(crate) struct DaCacheMetrics {
    /// Reads served from the signed cache.
    pub hits: Counter,
    /// Reads that fell through to the base store.
    pub misses: Counter,
    /// Cached entries rejected because their HMAC tag did not match.
    pub auth_failures: Counter,
    /// Cache writes that failed and were swallowed.
    pub write_errors: Counter,
}

#[vise::register]
pub(crate) static METRICS: vise::Global<DaCacheMetrics> = vise::Global::new();

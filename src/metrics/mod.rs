//! # Metrics
//!
//! Prometheus export for the reconciliation counters.
//!
//! **Counters:**
//! - `vouch_decisions_total{outcome}` - Requests by outcome (`forced`, `reused`, `none`)
//! - `vouch_candidates_rejected_total{reason}` - Candidates skipped by soft error
//! - `vouch_profile_writes_total` - Profile saves by the synchronizer

pub use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const DECISIONS_TOTAL: &str = "vouch_decisions_total";
pub const CANDIDATES_REJECTED_TOTAL: &str = "vouch_candidates_rejected_total";
pub const PROFILE_WRITES_TOTAL: &str = "vouch_profile_writes_total";

/// Register descriptions for the exported counters.
pub fn describe_metrics() {
    metrics::describe_counter!(
        DECISIONS_TOTAL,
        "Reconciliation decisions by outcome (forced, reused, none)"
    );
    metrics::describe_counter!(
        CANDIDATES_REJECTED_TOTAL,
        "Candidate names rejected during reconciliation, by reason"
    );
    metrics::describe_counter!(
        PROFILE_WRITES_TOTAL,
        "Profile saves performed by the attribute synchronizer"
    );
}

/// Install the global Prometheus recorder.
///
/// Returns a handle that renders the exposition text.
pub fn setup_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

/// Handle for a recorder that is not installed globally.
///
/// Used when a global recorder already exists (tests, embedding
/// applications); `/metrics` then renders an empty page.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

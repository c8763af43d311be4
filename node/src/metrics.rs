//! Prometheus metrics for the admission pipeline.
//!
//! The [`PipelineMetrics`] struct owns a dedicated [`Registry`] so several
//! pipelines can live in one process (tests do this constantly) without
//! clashing on the global default registry.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use ballot_types::RejectReason;

/// Central collection of all pipeline-level Prometheus metrics.
pub struct PipelineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Every submission attempt, saturated ones included.
    pub requests_submitted: IntCounter,
    /// Ballots that reached replication quorum and were confirmed.
    pub ballots_confirmed: IntCounter,
    /// Rejections, labelled by reason code.
    pub ballots_rejected: IntCounterVec,
    /// Submissions refused because the queue was full.
    pub requests_saturated: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub queue_depth: IntGauge,
    pub active_locks: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Worker time per request, from dequeue to outcome, in milliseconds.
    pub admission_latency_ms: Histogram,
    /// Time until the replication quorum decision, in milliseconds.
    pub replication_latency_ms: Histogram,
}

impl PipelineMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let requests_submitted = register_int_counter_with_registry!(
            Opts::new(
                "ballot_requests_submitted_total",
                "Total vote submissions offered to the scheduler"
            ),
            registry
        )
        .expect("failed to register requests_submitted counter");

        let ballots_confirmed = register_int_counter_with_registry!(
            Opts::new(
                "ballot_ballots_confirmed_total",
                "Total ballots confirmed after reaching replication quorum"
            ),
            registry
        )
        .expect("failed to register ballots_confirmed counter");

        let ballots_rejected = register_int_counter_vec_with_registry!(
            Opts::new("ballot_ballots_rejected_total", "Total rejected votes by reason"),
            &["reason"],
            registry
        )
        .expect("failed to register ballots_rejected counter");

        let requests_saturated = register_int_counter_with_registry!(
            Opts::new(
                "ballot_requests_saturated_total",
                "Total submissions refused because the admission queue was full"
            ),
            registry
        )
        .expect("failed to register requests_saturated counter");

        // Gauges
        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("ballot_queue_depth", "Requests waiting for a worker"),
            registry
        )
        .expect("failed to register queue_depth gauge");

        let active_locks = register_int_gauge_with_registry!(
            Opts::new("ballot_active_locks", "Voter locks currently held"),
            registry
        )
        .expect("failed to register active_locks gauge");

        // Histograms – exponential buckets covering 1 ms → ~16 s.
        let admission_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "ballot_admission_latency_ms",
                "Worker time per admission in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register admission_latency_ms histogram");

        let replication_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "ballot_replication_latency_ms",
                "Time until the replication quorum decision in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register replication_latency_ms histogram");

        Self {
            registry,
            requests_submitted,
            ballots_confirmed,
            ballots_rejected,
            requests_saturated,
            queue_depth,
            active_locks,
            admission_latency_ms,
            replication_latency_ms,
        }
    }

    pub fn record_rejection(&self, reason: &RejectReason) {
        self.ballots_rejected
            .with_label_values(&[reason.code()])
            .inc();
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_without_panic() {
        let metrics = PipelineMetrics::new();
        metrics.requests_submitted.inc();
        metrics.queue_depth.set(7);
        metrics.admission_latency_ms.observe(12.0);
        assert_eq!(metrics.requests_submitted.get(), 1);
        assert_eq!(metrics.queue_depth.get(), 7);
    }

    #[test]
    fn rejections_are_labelled_by_reason() {
        let metrics = PipelineMetrics::new();
        metrics.record_rejection(&RejectReason::AlreadyVoted);
        metrics.record_rejection(&RejectReason::AlreadyVoted);
        metrics.record_rejection(&RejectReason::LockContended);
        assert_eq!(
            metrics
                .ballots_rejected
                .with_label_values(&["already_voted"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .ballots_rejected
                .with_label_values(&["lock_contended"])
                .get(),
            1
        );
    }

    #[test]
    fn encode_produces_text_exposition() {
        let metrics = PipelineMetrics::new();
        metrics.ballots_confirmed.inc();
        let text = metrics.encode();
        assert!(text.contains("ballot_ballots_confirmed_total 1"));
    }

    #[test]
    fn independent_registries_do_not_clash() {
        let a = PipelineMetrics::new();
        let b = PipelineMetrics::new();
        a.requests_saturated.inc();
        assert_eq!(b.requests_saturated.get(), 0);
    }
}

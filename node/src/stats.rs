//! Running pipeline counters and the point-in-time snapshot built from them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ballot_types::VoteOutcome;

/// Monotonic counters updated by the scheduler and workers.
#[derive(Default)]
pub struct PipelineStats {
    total_requests: AtomicU64,
    confirmed: AtomicU64,
    rejected: AtomicU64,
    saturated: AtomicU64,
    processed: AtomicU64,
    processing_micros: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_saturated(&self) {
        self.saturated.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a worker-produced outcome and the time spent producing it.
    pub fn record_outcome(&self, outcome: &VoteOutcome, elapsed: Duration) {
        match outcome {
            VoteOutcome::Confirmed(_) => self.confirmed.fetch_add(1, Ordering::Relaxed),
            VoteOutcome::Rejected(_) => self.rejected.fetch_add(1, Ordering::Relaxed),
            VoteOutcome::Saturated => self.saturated.fetch_add(1, Ordering::Relaxed),
        };
        self.processed.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.processing_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn confirmed(&self) -> u64 {
        self.confirmed.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn saturated(&self) -> u64 {
        self.saturated.load(Ordering::Relaxed)
    }

    pub fn average_processing_ms(&self) -> f64 {
        match self.processed.load(Ordering::Relaxed) {
            0 => 0.0,
            n => self.processing_micros.load(Ordering::Relaxed) as f64 / n as f64 / 1000.0,
        }
    }
}

/// Point-in-time view of the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub saturated: u64,
    pub active_locks: usize,
    pub queue_depth: usize,
    pub distinct_voters: u64,
    pub average_processing_ms: f64,
}

impl StatsSnapshot {
    /// Percentage of submissions that ended confirmed.
    pub fn success_rate(&self) -> f64 {
        match self.total_requests {
            0 => 0.0,
            total => self.confirmed as f64 / total as f64 * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::RejectReason;

    #[test]
    fn counts_outcomes_by_kind() {
        let stats = PipelineStats::new();
        for _ in 0..3 {
            stats.record_submitted();
        }
        stats.record_outcome(
            &VoteOutcome::Rejected(RejectReason::LockContended),
            Duration::from_millis(4),
        );
        stats.record_outcome(
            &VoteOutcome::Rejected(RejectReason::AlreadyVoted),
            Duration::from_millis(2),
        );
        stats.record_saturated();

        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.rejected(), 2);
        assert_eq!(stats.saturated(), 1);
        assert_eq!(stats.confirmed(), 0);
        assert!((stats.average_processing_ms() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn average_is_zero_before_any_outcome() {
        assert_eq!(PipelineStats::new().average_processing_ms(), 0.0);
    }

    #[test]
    fn success_rate_is_percentage_of_submissions() {
        let snapshot = StatsSnapshot {
            total_requests: 8,
            confirmed: 6,
            ..StatsSnapshot::default()
        };
        assert!((snapshot.success_rate() - 75.0).abs() < 1e-9);
        assert_eq!(StatsSnapshot::default().success_rate(), 0.0);
    }
}

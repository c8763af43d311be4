//! Fan-out of a ballot to the storage replicas.

use ballot_store::{BallotRecord, ReplicaIndex, ReplicaRecord, ReplicaStore, StoreError};
use ballot_types::{Ballot, BallotId, BallotStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::quorum::{quorum_size, QuorumDecision, QuorumTracker};
use crate::ReplicationError;

/// Timeouts applied to every replica call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationConfig {
    /// Bound on a single replica write.
    pub write_timeout: Duration,
    /// Bound on a single replica read during a consistency check.
    pub read_timeout: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_millis(5_000),
            read_timeout: Duration::from_millis(1_000),
        }
    }
}

/// Why a single replica attempt failed. Never fatal to the pipeline; folded
/// into the quorum count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicaFailure {
    #[error("replica timed out after {0:?}")]
    Timeout(Duration),

    #[error("replica store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one replica write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaWriteResult {
    pub replica: ReplicaIndex,
    pub success: bool,
    pub latency: Duration,
    pub failure: Option<ReplicaFailure>,
}

impl ReplicaWriteResult {
    pub fn timed_out(&self) -> bool {
        matches!(self.failure, Some(ReplicaFailure::Timeout(_)))
    }
}

/// Everything learned from one replication round.
#[derive(Clone, Debug)]
pub struct ReplicationReport {
    pub ballot: BallotId,
    pub decision: QuorumDecision,
    /// Acknowledgements over the whole round, stragglers included.
    pub acknowledged: usize,
    pub required: usize,
    pub total: usize,
    /// Replica outcomes that had arrived when the decision was settled.
    pub decided_after: usize,
    pub decision_latency: Duration,
    /// Per-replica outcomes ordered by replica index.
    pub results: Vec<ReplicaWriteResult>,
}

impl ReplicationReport {
    pub fn succeeded(&self) -> bool {
        self.decision == QuorumDecision::Reached
    }

    pub fn timeouts(&self) -> usize {
        self.results.iter().filter(|r| r.timed_out()).count()
    }
}

/// Cumulative replication counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStats {
    pub successful: u64,
    pub failed: u64,
}

impl ReplicationStats {
    pub fn total(&self) -> u64 {
        self.successful + self.failed
    }

    /// Percentage of rounds that reached quorum.
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.successful as f64 / total as f64 * 100.0,
        }
    }
}

/// Fans confirmed ballots out to R replicas and applies the quorum rule.
pub struct ReplicationCoordinator {
    replicas: Vec<Arc<dyn ReplicaStore>>,
    config: ReplicationConfig,
    successful: AtomicU64,
    failed: AtomicU64,
}

impl ReplicationCoordinator {
    pub fn new(
        replicas: Vec<Arc<dyn ReplicaStore>>,
        config: ReplicationConfig,
    ) -> Result<Self, ReplicationError> {
        if replicas.is_empty() {
            return Err(ReplicationError::EmptyReplicaSet);
        }
        Ok(Self {
            replicas,
            config,
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Acknowledgements needed for a ballot to be durable.
    pub fn quorum(&self) -> usize {
        quorum_size(self.replicas.len())
    }

    pub fn config(&self) -> ReplicationConfig {
        self.config
    }

    /// Write the ballot, as confirmed, to every replica exactly once.
    ///
    /// Waits until every attempt has completed or timed out so straggler
    /// outcomes land in the report; the decision itself is fixed as soon as
    /// the quorum is settled.
    pub async fn replicate(&self, ballot: &Ballot) -> ReplicationReport {
        let record = BallotRecord::from_ballot(ballot).with_status(BallotStatus::Confirmed);
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (index, replica) in self.replicas.iter().enumerate() {
            let replica = Arc::clone(replica);
            let timeout = self.config.write_timeout;
            let copy = ReplicaRecord {
                replica: ReplicaIndex::new(index),
                record: record.clone(),
            };
            tasks.spawn(async move {
                let attempt_started = Instant::now();
                let failure = match tokio::time::timeout(timeout, replica.write(&copy)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(ReplicaFailure::Store(e)),
                    Err(_) => Some(ReplicaFailure::Timeout(timeout)),
                };
                ReplicaWriteResult {
                    replica: copy.replica,
                    success: failure.is_none(),
                    latency: attempt_started.elapsed(),
                    failure,
                }
            });
        }

        let mut tracker = QuorumTracker::new(self.replicas.len());
        let mut results = Vec::with_capacity(self.replicas.len());
        let mut decided_after = 0;
        let mut decision_latency = Duration::ZERO;

        while let Some(joined) = tasks.join_next().await {
            let success = match joined {
                Ok(result) => {
                    if let Some(failure) = &result.failure {
                        tracing::warn!(
                            ballot = %ballot.id,
                            replica = %result.replica,
                            error = %failure,
                            "replica write failed"
                        );
                    }
                    let success = result.success;
                    results.push(result);
                    success
                }
                Err(e) => {
                    tracing::warn!(ballot = %ballot.id, error = %e, "replica write task aborted");
                    false
                }
            };

            if let Some(decision) = tracker.record(success) {
                decided_after = tracker.recorded();
                decision_latency = started.elapsed();
                tracing::debug!(
                    ballot = %ballot.id,
                    ?decision,
                    decided_after,
                    latency_ms = decision_latency.as_millis() as u64,
                    "quorum settled"
                );
            }
        }

        results.sort_by_key(|r| r.replica);
        let decision = tracker.decision().unwrap_or(QuorumDecision::Unreachable);
        match decision {
            QuorumDecision::Reached => self.successful.fetch_add(1, Ordering::Relaxed),
            QuorumDecision::Unreachable => self.failed.fetch_add(1, Ordering::Relaxed),
        };

        ReplicationReport {
            ballot: ballot.id,
            decision,
            acknowledged: tracker.acknowledged(),
            required: tracker.required(),
            total: tracker.total(),
            decided_after,
            decision_latency,
            results,
        }
    }

    pub fn stats(&self) -> ReplicationStats {
        ReplicationStats {
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn replicas(&self) -> &[Arc<dyn ReplicaStore>] {
        &self.replicas
    }
}

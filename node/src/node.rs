//! The ballot node — wires ledger, locks, replication and the scheduler
//! together behind one submission facade.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::Instrument;

use ballot_ledger::VoteLedger;
use ballot_replication::{ConsistencyReport, ReplicationCoordinator};
use ballot_store::{MemoryReplica, ReplicaStore};
use ballot_types::{
    AdmissionRequest, BallotId, CandidateId, Clock, RequestId, SystemClock, VoteOutcome, VoterId,
};

use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{NodeError, SubmitError};
use crate::scheduler::{AdmissionScheduler, PendingAdmission};
use crate::stats::StatsSnapshot;
use crate::tracing_spans::consistency_span;

pub struct VotingNode {
    scheduler: AdmissionScheduler,
    next_request: AtomicU64,
}

impl VotingNode {
    /// Start a node whose replicas are in-memory stores with the configured
    /// simulated latency.
    pub fn with_memory_replicas(config: &PipelineConfig) -> Result<Self, NodeError> {
        let replicas = (0..config.replica_count)
            .map(|_| {
                Arc::new(MemoryReplica::with_latency(config.replica_latency()))
                    as Arc<dyn ReplicaStore>
            })
            .collect();
        Self::start(config, replicas)
    }

    pub fn start(
        config: &PipelineConfig,
        replicas: Vec<Arc<dyn ReplicaStore>>,
    ) -> Result<Self, NodeError> {
        Self::start_with_clock(config, replicas, Arc::new(SystemClock))
    }

    /// Start a node on the current tokio runtime.
    pub fn start_with_clock(
        config: &PipelineConfig,
        replicas: Vec<Arc<dyn ReplicaStore>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        if replicas.len() != config.replica_count {
            return Err(NodeError::Config(format!(
                "replica_count is {} but {} replica targets were supplied",
                config.replica_count,
                replicas.len()
            )));
        }

        let replication = ReplicationCoordinator::new(replicas, config.replication_config())?;
        let context = Arc::new(PipelineContext::new(
            VoteLedger::new(config.candidate_set()),
            replication,
            clock,
            config.lease(),
            config.processed_cache_capacity,
        ));
        tracing::info!(
            workers = config.worker_count,
            replicas = config.replica_count,
            quorum = context.replication.quorum(),
            candidates = config.candidates.len(),
            "voting node started"
        );
        let scheduler =
            AdmissionScheduler::start(context, config.worker_count, config.queue_capacity);
        Ok(Self {
            scheduler,
            next_request: AtomicU64::new(1),
        })
    }

    pub fn context(&self) -> &PipelineContext {
        self.scheduler.context()
    }

    /// Build a request stamped with a fresh id and the current time.
    pub fn new_request(&self, voter: VoterId, candidate: CandidateId) -> AdmissionRequest {
        let id = RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed));
        let name = self
            .context()
            .ledger
            .candidates()
            .name(&candidate)
            .unwrap_or_default()
            .to_string();
        AdmissionRequest::new(id, voter, candidate, name, self.context().clock.now())
    }

    /// Hand a request to the scheduler without waiting for its outcome.
    pub fn submit(&self, request: AdmissionRequest) -> Result<PendingAdmission, SubmitError> {
        self.scheduler.submit(request)
    }

    /// Submit a vote and wait for its definitive outcome.
    ///
    /// A full queue yields [`VoteOutcome::Saturated`]; only a shut-down node
    /// or a lost worker produce an error.
    pub async fn submit_vote(
        &self,
        voter: VoterId,
        candidate: CandidateId,
    ) -> Result<VoteOutcome, SubmitError> {
        match self.submit(self.new_request(voter, candidate)) {
            Ok(pending) => pending.outcome().await,
            Err(SubmitError::SchedulerSaturated { .. }) => Ok(VoteOutcome::Saturated),
            Err(e) => Err(e),
        }
    }

    /// Confirmed ballots per candidate, zero counts included.
    pub fn tally(&self) -> BTreeMap<CandidateId, u64> {
        self.context().ledger.tally()
    }

    pub fn stats(&self) -> StatsSnapshot {
        let context = self.context();
        let active_locks = context.locks.active_locks();
        context.metrics.active_locks.set(active_locks as i64);
        StatsSnapshot {
            total_requests: context.stats.total_requests(),
            confirmed: context.stats.confirmed(),
            rejected: context.stats.rejected(),
            saturated: context.stats.saturated(),
            active_locks,
            queue_depth: self.scheduler.queue_depth(),
            distinct_voters: context.ledger.summary().voters,
            average_processing_ms: context.stats.average_processing_ms(),
        }
    }

    /// Read a ballot back from every replica and compare with the ledger.
    pub async fn check_consistency(&self, ballot: BallotId) -> Result<ConsistencyReport, NodeError> {
        let context = self.context();
        let report = context
            .replication
            .check_consistency(ballot, &context.ledger)
            .instrument(consistency_span(ballot))
            .await?;
        Ok(report)
    }

    /// Stop accepting votes and wait until every queued vote has an outcome.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        let stats = self.stats();
        tracing::info!(
            total = stats.total_requests,
            confirmed = stats.confirmed,
            rejected = stats.rejected,
            saturated = stats.saturated,
            "voting node stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::{BallotStatus, RejectReason};

    fn config() -> PipelineConfig {
        PipelineConfig {
            worker_count: 2,
            queue_capacity: 16,
            replica_write_timeout_ms: 500,
            replica_read_timeout_ms: 200,
            lease_ms: 2_000,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn rejects_mismatched_replica_count() {
        let result = VotingNode::start(&config(), vec![Arc::new(MemoryReplica::new())]);
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let bad = PipelineConfig {
            queue_capacity: 0,
            ..config()
        };
        assert!(VotingNode::with_memory_replicas(&bad).is_err());
    }

    #[tokio::test]
    async fn new_request_fills_candidate_name_and_fresh_ids() {
        let node = VotingNode::with_memory_replicas(&config()).unwrap();
        let a = node.new_request(VoterId::from("u1"), CandidateId::from("2"));
        let b = node.new_request(VoterId::from("u1"), CandidateId::from("9"));
        assert_eq!(a.candidate_name, "Bob");
        assert_eq!(b.candidate_name, "");
        assert_ne!(a.id, b.id);
        node.shutdown().await;
    }

    #[tokio::test]
    async fn confirmed_vote_is_consistent_across_replicas() {
        let node = VotingNode::with_memory_replicas(&config()).unwrap();
        let outcome = node
            .submit_vote(VoterId::from("u1"), CandidateId::from("1"))
            .await
            .unwrap();
        let VoteOutcome::Confirmed(ballot) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(ballot.status, BallotStatus::Confirmed);

        let report = node.check_consistency(ballot.id).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.agreeing_replicas, 3);

        let stats = node.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.active_locks, 0);
        assert_eq!(stats.distinct_voters, 1);
        node.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_candidate_is_rejected_without_a_ballot() {
        let node = VotingNode::with_memory_replicas(&config()).unwrap();
        let outcome = node
            .submit_vote(VoterId::from("u1"), CandidateId::from("42"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            VoteOutcome::Rejected(RejectReason::UnknownCandidate(CandidateId::from("42")))
        );
        assert_eq!(node.context().ledger.summary().voters, 0);
        assert_eq!(node.tally().values().sum::<u64>(), 0);
        node.shutdown().await;
    }

    #[tokio::test]
    async fn consistency_check_of_unknown_ballot_errors() {
        let node = VotingNode::with_memory_replicas(&config()).unwrap();
        let result = node.check_consistency(BallotId::new(999)).await;
        assert!(matches!(result, Err(NodeError::Replication(_))));
        node.shutdown().await;
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_refused() {
        let node = VotingNode::with_memory_replicas(&config()).unwrap();
        node.shutdown().await;
        let result = node
            .submit_vote(VoterId::from("u1"), CandidateId::from("1"))
            .await;
        assert_eq!(result, Err(SubmitError::ShuttingDown));
    }
}

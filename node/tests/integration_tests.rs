//! Integration tests exercising the full admission pipeline:
//! submission → scheduler → voter lock → ledger → quorum replication → outcome.
//!
//! Replicas are nullable stores whose behaviour each test scripts, so quorum
//! success, failure and timeouts can be produced on demand.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use ballot_node::{PipelineConfig, SubmitError, VotingNode};
use ballot_nullables::{NullClock, NullReplica, ReplicaBehavior};
use ballot_store::{ReplicaIndex, ReplicaStore};
use ballot_types::{CandidateId, RejectReason, SessionId, VoteOutcome, VoterId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> PipelineConfig {
    PipelineConfig {
        worker_count: 5,
        queue_capacity: 1000,
        replica_count: 3,
        replica_write_timeout_ms: 300,
        replica_read_timeout_ms: 200,
        lease_ms: 2_000,
        ..PipelineConfig::default()
    }
}

fn replicas(behaviors: &[ReplicaBehavior]) -> Vec<Arc<NullReplica>> {
    behaviors
        .iter()
        .map(|b| Arc::new(NullReplica::new(*b)))
        .collect()
}

fn as_stores(replicas: &[Arc<NullReplica>]) -> Vec<Arc<dyn ReplicaStore>> {
    replicas
        .iter()
        .map(|r| r.clone() as Arc<dyn ReplicaStore>)
        .collect()
}

fn healthy_node(config: &PipelineConfig) -> VotingNode {
    let replicas = replicas(&vec![ReplicaBehavior::Healthy; config.replica_count]);
    VotingNode::start(config, as_stores(&replicas)).expect("node starts")
}

fn voter(name: &str) -> VoterId {
    VoterId::from(name)
}

fn candidate(id: &str) -> CandidateId {
    CandidateId::from(id)
}

// ---------------------------------------------------------------------------
// One ballot per voter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_vote_from_same_voter_is_already_voted() {
    let node = healthy_node(&test_config());

    let first = node.submit_vote(voter("u1"), candidate("1")).await.unwrap();
    assert!(first.is_confirmed());

    let second = node.submit_vote(voter("u1"), candidate("2")).await.unwrap();
    assert_eq!(second, VoteOutcome::Rejected(RejectReason::AlreadyVoted));

    let tally = node.tally();
    assert_eq!(tally[&candidate("1")], 1);
    assert_eq!(tally[&candidate("2")], 0);
    assert_eq!(tally[&candidate("3")], 0);
    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_for_one_voter_confirm_at_most_once() {
    let node = Arc::new(healthy_node(&test_config()));

    let mut tasks = JoinSet::new();
    for i in 0..20 {
        let node = node.clone();
        let choice = candidate(["1", "2", "3"][i % 3]);
        tasks.spawn(async move { node.submit_vote(voter("u1"), choice).await });
    }

    let mut confirmed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap().unwrap() {
            VoteOutcome::Confirmed(_) => confirmed += 1,
            VoteOutcome::Rejected(RejectReason::AlreadyVoted | RejectReason::LockContended) => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert!(confirmed <= 1);
    assert_eq!(node.tally().values().sum::<u64>(), confirmed);
    assert_eq!(node.stats().active_locks, 0);
    node.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_distinct_voters_all_confirm() {
    let node = Arc::new(healthy_node(&test_config()));

    let mut tasks = JoinSet::new();
    for i in 0..100 {
        let node = node.clone();
        let choice = candidate(["1", "2", "3"][i % 3]);
        tasks.spawn(async move { node.submit_vote(voter(&format!("voter-{i}")), choice).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().unwrap().is_confirmed());
    }

    let tally = node.tally();
    assert_eq!(tally.values().sum::<u64>(), 100);
    assert_eq!(tally[&candidate("1")], 34);
    assert_eq!(tally[&candidate("2")], 33);
    assert_eq!(tally[&candidate("3")], 33);

    let stats = node.stats();
    assert_eq!(stats.total_requests, 100);
    assert_eq!(stats.confirmed, 100);
    assert_eq!(stats.distinct_voters, 100);
    assert!((stats.success_rate() - 100.0).abs() < 1e-9);
    node.shutdown().await;
}

// ---------------------------------------------------------------------------
// Quorum replication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failed_replica_of_three_still_confirms() {
    let replicas = replicas(&[
        ReplicaBehavior::Healthy,
        ReplicaBehavior::Healthy,
        ReplicaBehavior::Failing,
    ]);
    let node = VotingNode::start(&test_config(), as_stores(&replicas)).unwrap();

    let outcome = node.submit_vote(voter("u1"), candidate("1")).await.unwrap();
    let VoteOutcome::Confirmed(ballot) = outcome else {
        panic!("expected confirmation, got {outcome:?}");
    };

    let report = node.check_consistency(ballot.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.agreeing_replicas, 2);
    assert_eq!(report.missing, vec![ReplicaIndex::new(2)]);
    node.shutdown().await;
}

#[tokio::test]
async fn hanging_replica_times_out_without_blocking_confirmation() {
    let replicas = replicas(&[
        ReplicaBehavior::Healthy,
        ReplicaBehavior::Hanging,
        ReplicaBehavior::Healthy,
    ]);
    let node = VotingNode::start(&test_config(), as_stores(&replicas)).unwrap();

    let outcome = node.submit_vote(voter("u1"), candidate("3")).await.unwrap();
    assert!(outcome.is_confirmed());
    assert_eq!(node.tally()[&candidate("3")], 1);
    node.shutdown().await;
}

#[tokio::test]
async fn quorum_failure_rolls_back_and_voter_may_retry() {
    let replicas = replicas(&[
        ReplicaBehavior::Healthy,
        ReplicaBehavior::Failing,
        ReplicaBehavior::Failing,
    ]);
    let node = VotingNode::start(&test_config(), as_stores(&replicas)).unwrap();

    let outcome = node.submit_vote(voter("u1"), candidate("1")).await.unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Rejected(RejectReason::ReplicationQuorumFailed {
            acknowledged: 1,
            required: 2,
        })
    );
    assert_eq!(node.tally()[&candidate("1")], 0);
    assert!(!node.context().ledger.has_voted(&voter("u1")));
    assert_eq!(node.context().ledger.summary().rejected, 1);

    replicas[1].set_behavior(ReplicaBehavior::Healthy);
    let retry = node.submit_vote(voter("u1"), candidate("1")).await.unwrap();
    assert!(retry.is_confirmed());
    assert_eq!(node.tally()[&candidate("1")], 1);
    node.shutdown().await;
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stranded_lock_blocks_until_its_lease_expires() {
    let clock = Arc::new(NullClock::default());
    let replicas = replicas(&[ReplicaBehavior::Healthy; 3]);
    let config = test_config();
    let node = VotingNode::start_with_clock(&config, as_stores(&replicas), clock.clone()).unwrap();

    let crashed = SessionId::new("crashed-worker");
    assert!(node
        .context()
        .locks
        .acquire(&voter("u1"), &crashed, config.lease()));

    let blocked = node.submit_vote(voter("u1"), candidate("2")).await.unwrap();
    assert_eq!(blocked, VoteOutcome::Rejected(RejectReason::LockContended));
    assert!(!node.context().ledger.has_voted(&voter("u1")));

    clock.advance(config.lease() + Duration::from_millis(1));
    let recovered = node.submit_vote(voter("u1"), candidate("2")).await.unwrap();
    assert!(recovered.is_confirmed());
    assert_eq!(node.stats().active_locks, 0);
    node.shutdown().await;
}

// ---------------------------------------------------------------------------
// Backpressure and shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn saturated_queue_refuses_instead_of_dropping() {
    let replicas = replicas(&[ReplicaBehavior::Hanging; 3]);
    let config = PipelineConfig {
        worker_count: 2,
        queue_capacity: 3,
        ..test_config()
    };
    let node = VotingNode::start(&config, as_stores(&replicas)).unwrap();

    // Occupy both workers with replication rounds that can only time out.
    let mut pending = Vec::new();
    for i in 0..2 {
        let request = node.new_request(voter(&format!("busy-{i}")), candidate("1"));
        pending.push(node.submit(request).unwrap());
    }
    while node.stats().queue_depth > 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for i in 0..3 {
        let request = node.new_request(voter(&format!("queued-{i}")), candidate("2"));
        pending.push(node.submit(request).unwrap());
    }
    let overflow = node.new_request(voter("overflow"), candidate("3"));
    assert_eq!(
        node.submit(overflow).unwrap_err(),
        SubmitError::SchedulerSaturated { capacity: 3 }
    );
    assert_eq!(
        node.submit_vote(voter("overflow"), candidate("3")).await.unwrap(),
        VoteOutcome::Saturated
    );

    for p in pending {
        assert_eq!(
            p.outcome().await.unwrap(),
            VoteOutcome::Rejected(RejectReason::ReplicationQuorumFailed {
                acknowledged: 0,
                required: 2,
            })
        );
    }
    let stats = node.stats();
    assert_eq!(stats.saturated, 2);
    assert_eq!(stats.rejected, 5);
    assert_eq!(stats.total_requests, 7);
    assert_eq!(node.tally().values().sum::<u64>(), 0);
    node.shutdown().await;
}

#[tokio::test]
async fn shutdown_answers_every_queued_vote() {
    let replicas = replicas(&[ReplicaBehavior::Delayed(Duration::from_millis(10)); 3]);
    let config = PipelineConfig {
        worker_count: 1,
        ..test_config()
    };
    let node = VotingNode::start(&config, as_stores(&replicas)).unwrap();

    let pending: Vec<_> = (0..10)
        .map(|i| {
            let request = node.new_request(voter(&format!("u{i}")), candidate("1"));
            node.submit(request).unwrap()
        })
        .collect();
    node.shutdown().await;

    for p in pending {
        assert!(p.outcome().await.unwrap().is_confirmed());
    }
    assert_eq!(node.tally()[&candidate("1")], 10);
    assert_eq!(
        node.submit_vote(voter("late"), candidate("1")).await,
        Err(SubmitError::ShuttingDown)
    );
}

// ---------------------------------------------------------------------------
// Idempotent delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redelivered_request_replays_its_outcome() {
    let replicas = replicas(&[ReplicaBehavior::Healthy; 3]);
    let node = VotingNode::start(&test_config(), as_stores(&replicas)).unwrap();

    let request = node.new_request(voter("u1"), candidate("2"));
    let first = node.submit(request.clone()).unwrap().outcome().await.unwrap();
    let again = node.submit(request).unwrap().outcome().await.unwrap();

    assert!(first.is_confirmed());
    assert_eq!(first, again);
    assert_eq!(node.context().ledger.summary().confirmed, 1);
    assert!(replicas.iter().all(|r| r.write_attempts() == 1));
    node.shutdown().await;
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_follow_outcomes() {
    let node = healthy_node(&test_config());
    node.submit_vote(voter("u1"), candidate("1")).await.unwrap();
    node.submit_vote(voter("u1"), candidate("1")).await.unwrap();

    let metrics = &node.context().metrics;
    assert_eq!(metrics.requests_submitted.get(), 2);
    assert_eq!(metrics.ballots_confirmed.get(), 1);
    assert_eq!(
        metrics
            .ballots_rejected
            .with_label_values(&["already_voted"])
            .get(),
        1
    );
    assert!(metrics.encode().contains("ballot_replication_latency_ms"));
    node.shutdown().await;
}

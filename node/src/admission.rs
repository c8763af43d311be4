//! The per-request admission sequence run by a worker.
//!
//! candidate check → voter lock → ledger insert → quorum replication →
//! confirm or reject → lock release. The lock is released on every path
//! once acquired.

use std::time::Instant;

use tracing::Instrument;

use ballot_types::{AdmissionRequest, Ballot, BallotStatus, RejectReason, SessionId, VoteOutcome};

use crate::context::PipelineContext;
use crate::recently_processed::Delivery;
use crate::tracing_spans::replicate_span;

/// Admit one request and produce its definitive outcome.
///
/// Repeated delivery of a request id has no further effect: a completed id
/// replays its recorded outcome, and an id still in flight is reported as
/// lock contention since its first delivery holds the voter's lock.
pub async fn admit(ctx: &PipelineContext, worker: usize, request: &AdmissionRequest) -> VoteOutcome {
    let delivery = ctx.processed().begin(request.id);
    match delivery {
        Delivery::First => {}
        Delivery::Completed(outcome) => {
            tracing::debug!(request = %request.id, "replaying outcome for duplicate delivery");
            return outcome;
        }
        Delivery::InFlight => {
            tracing::debug!(request = %request.id, "duplicate delivery while in flight");
            return VoteOutcome::Rejected(RejectReason::LockContended);
        }
    }

    let started = Instant::now();
    let outcome = run(ctx, worker, request).await;
    let elapsed = started.elapsed();

    ctx.processed().finish(request.id, outcome.clone());
    ctx.stats.record_outcome(&outcome, elapsed);
    ctx.metrics
        .admission_latency_ms
        .observe(elapsed.as_secs_f64() * 1000.0);
    match &outcome {
        VoteOutcome::Confirmed(ballot) => {
            ctx.metrics.ballots_confirmed.inc();
            tracing::info!(ballot = %ballot.id, candidate = %ballot.candidate, "vote confirmed");
        }
        VoteOutcome::Rejected(reason) => {
            ctx.metrics.record_rejection(reason);
            tracing::info!(reason = reason.code(), "vote rejected");
        }
        VoteOutcome::Saturated => {}
    }
    outcome
}

async fn run(ctx: &PipelineContext, worker: usize, request: &AdmissionRequest) -> VoteOutcome {
    if !ctx.ledger.candidates().contains(&request.candidate) {
        return VoteOutcome::Rejected(RejectReason::UnknownCandidate(request.candidate.clone()));
    }

    let session = SessionId::for_worker(worker, request.id);
    if !ctx.locks.acquire(&request.voter, &session, ctx.lease) {
        tracing::debug!(session = %session, "voter lock contended");
        return VoteOutcome::Rejected(RejectReason::LockContended);
    }
    tracing::debug!(session = %session, "voter lock acquired");
    ctx.metrics.active_locks.set(ctx.locks.active_locks() as i64);

    let outcome = admit_locked(ctx, request, &session).await;

    if !ctx.locks.release(&request.voter, &session) {
        tracing::warn!(voter = %request.voter, session = %session, "lease lapsed before release");
    }
    ctx.metrics.active_locks.set(ctx.locks.active_locks() as i64);
    outcome
}

async fn admit_locked(
    ctx: &PipelineContext,
    request: &AdmissionRequest,
    session: &SessionId,
) -> VoteOutcome {
    let recorded =
        ctx.ledger
            .try_record(&request.voter, &request.candidate, session, ctx.clock.now());
    if !recorded.accepted {
        return VoteOutcome::Rejected(RejectReason::AlreadyVoted);
    }
    let ballot = recorded.ballot;
    tracing::debug!(ballot = %ballot.id, candidate = %ballot.candidate, "pending ballot recorded");

    let report = ctx
        .replication
        .replicate(&ballot)
        .instrument(replicate_span(ballot.id, ctx.replication.replica_count()))
        .await;
    ctx.metrics
        .replication_latency_ms
        .observe(report.decision_latency.as_secs_f64() * 1000.0);

    if report.succeeded() {
        return confirm(ctx, ballot);
    }

    if let Err(e) = ctx.ledger.reject(ballot.id) {
        tracing::error!(ballot = %ballot.id, error = %e, "failed to roll back pending ballot");
    }
    tracing::warn!(
        ballot = %ballot.id,
        acknowledged = report.acknowledged,
        required = report.required,
        timeouts = report.timeouts(),
        "replication quorum not reached"
    );
    VoteOutcome::Rejected(RejectReason::ReplicationQuorumFailed {
        acknowledged: report.acknowledged,
        required: report.required,
    })
}

fn confirm(ctx: &PipelineContext, ballot: Ballot) -> VoteOutcome {
    match ctx.ledger.confirm(ballot.id) {
        Ok(BallotStatus::Confirmed) => VoteOutcome::Confirmed(Ballot {
            status: BallotStatus::Confirmed,
            ..ballot
        }),
        Ok(status) => {
            // Only this worker holds the voter's lock, so nothing else can
            // have settled the ballot.
            tracing::error!(ballot = %ballot.id, status = %status, "pending ballot settled elsewhere");
            VoteOutcome::Rejected(RejectReason::AlreadyVoted)
        }
        Err(e) => {
            tracing::error!(ballot = %ballot.id, error = %e, "failed to confirm ballot");
            VoteOutcome::Rejected(RejectReason::AlreadyVoted)
        }
    }
}

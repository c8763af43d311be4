//! Pre-built [`tracing::Span`] constructors for the admission pipeline.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate one vote's journey through scheduler, locks, ledger and
//! replicas.

use ballot_types::{BallotId, RequestId, VoterId};
use tracing::{info_span, Span};

/// Span covering the full admission sequence of a single request.
pub fn admission_span(request: RequestId, voter: &VoterId, worker: usize) -> Span {
    info_span!("admission", request = %request, voter = %voter, worker = worker)
}

/// Span covering the replica fan-out of a single ballot.
pub fn replicate_span(ballot: BallotId, replicas: usize) -> Span {
    info_span!("replicate", ballot = %ballot, replicas = replicas)
}

/// Span covering a diagnostic read-back of a single ballot.
pub fn consistency_span(ballot: BallotId) -> Span {
    info_span!("consistency_check", ballot = %ballot)
}

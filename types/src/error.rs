//! Terminal outcomes of a vote submission.
//!
//! Contended locks, repeat voters and failed replication are ordinary
//! outcomes, not errors: they surface as [`VoteOutcome::Rejected`] with a
//! [`RejectReason`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Ballot, CandidateId};

/// Why a vote was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("voter already holds a ballot")]
    AlreadyVoted,

    #[error("another admission for this voter is in flight")]
    LockContended,

    #[error("replication quorum failed: {acknowledged} of {required} required acknowledgements")]
    ReplicationQuorumFailed { acknowledged: usize, required: usize },

    #[error("unknown candidate: {0}")]
    UnknownCandidate(CandidateId),
}

impl RejectReason {
    /// Stable short code, used as a metric label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyVoted => "already_voted",
            Self::LockContended => "lock_contended",
            Self::ReplicationQuorumFailed { .. } => "replication_quorum_failed",
            Self::UnknownCandidate(_) => "unknown_candidate",
        }
    }

    /// Whether the submitter may retry the same vote later with a chance of success.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LockContended | Self::ReplicationQuorumFailed { .. }
        )
    }
}

/// The definitive result of submitting a vote. Never "unknown".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Confirmed(Ballot),
    Rejected(RejectReason),
    /// The scheduler queue was full; the request never entered the pipeline.
    Saturated,
}

impl VoteOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

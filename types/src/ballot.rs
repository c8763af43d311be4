//! Ballots and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BallotId, CandidateId, SessionId, Timestamp, VoterId};

/// Lifecycle status of a ballot.
///
/// `Pending` is the only non-terminal state. A ballot becomes `Confirmed`
/// only after quorum replication succeeds, and `Rejected` when replication
/// falls below quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallotStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl BallotStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a ballot in this state blocks further ballots from its voter.
    pub fn holds_vote(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for BallotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single voter's ballot as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub id: BallotId,
    pub voter: VoterId,
    pub candidate: CandidateId,
    pub cast_at: Timestamp,
    /// Worker session that recorded the ballot.
    pub session: SessionId,
    pub status: BallotStatus,
}

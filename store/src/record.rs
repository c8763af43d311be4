//! Persisted ballot records.
//!
//! The ledger holds one authoritative [`BallotRecord`] per voter; each of the
//! R replicas holds a [`ReplicaRecord`] copy tagged with its replica index.

use ballot_types::{Ballot, BallotId, BallotStatus, CandidateId, Timestamp, VoterId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a replica in the coordinator's target list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaIndex(usize);

impl ReplicaIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ReplicaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

/// The storage-facing view of a ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotRecord {
    pub ballot: BallotId,
    pub voter: VoterId,
    pub candidate: CandidateId,
    pub status: BallotStatus,
    pub timestamp: Timestamp,
}

impl BallotRecord {
    /// Record for `ballot` as it stands in the ledger.
    pub fn from_ballot(ballot: &Ballot) -> Self {
        Self {
            ballot: ballot.id,
            voter: ballot.voter.clone(),
            candidate: ballot.candidate.clone(),
            status: ballot.status,
            timestamp: ballot.cast_at,
        }
    }

    /// Same record with a different status.
    pub fn with_status(mut self, status: BallotStatus) -> Self {
        self.status = status;
        self
    }
}

/// A replica's copy of a ballot record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    pub replica: ReplicaIndex,
    pub record: BallotRecord,
}

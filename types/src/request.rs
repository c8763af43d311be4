//! Admission requests handed from submitters to the scheduler.

use serde::{Deserialize, Serialize};

use crate::{CandidateId, RequestId, Timestamp, VoterId};

/// A vote waiting to be admitted.
///
/// Immutable once enqueued: the scheduler owns it while queued, then the
/// worker that dequeues it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub id: RequestId,
    pub voter: VoterId,
    pub candidate: CandidateId,
    /// Display name as supplied by the submitter; informational only.
    pub candidate_name: String,
    pub submitted_at: Timestamp,
}

impl AdmissionRequest {
    pub fn new(
        id: RequestId,
        voter: VoterId,
        candidate: CandidateId,
        candidate_name: impl Into<String>,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            id,
            voter,
            candidate,
            candidate_name: candidate_name.into(),
            submitted_at,
        }
    }
}

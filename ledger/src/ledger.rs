//! The vote ledger.
//!
//! All state sits behind one mutex, so `try_record` is a single atomic
//! check-and-insert and `tally` reads a consistent snapshot. The per-voter
//! lock held by the admission worker keeps same-voter calls from racing in
//! the first place; the mutex keeps the ledger correct even if a lease
//! expires under a slow worker.

use ballot_store::BallotRecord;
use ballot_types::{
    Ballot, BallotId, BallotStatus, CandidateId, CandidateSet, SessionId, Timestamp, VoterId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::LedgerError;

/// Result of [`VoteLedger::try_record`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordResult {
    /// Whether a new pending ballot was inserted.
    pub accepted: bool,
    /// The new ballot when accepted, otherwise the voter's existing ballot.
    pub ballot: Ballot,
}

/// Summary statistics for the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub pending: u64,
    pub confirmed: u64,
    pub rejected: u64,
    /// Voters currently holding a pending or confirmed ballot.
    pub voters: u64,
}

#[derive(Default)]
struct LedgerState {
    ballots: HashMap<BallotId, Ballot>,
    /// Voter -> their single non-rejected ballot.
    holding: HashMap<VoterId, BallotId>,
    next_id: u64,
}

/// Authoritative record of admitted ballots.
pub struct VoteLedger {
    candidates: CandidateSet,
    state: Mutex<LedgerState>,
}

impl VoteLedger {
    pub fn new(candidates: CandidateSet) -> Self {
        Self {
            candidates,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a pending ballot for `voter` unless they already hold a
    /// pending or confirmed one.
    pub fn try_record(
        &self,
        voter: &VoterId,
        candidate: &CandidateId,
        session: &SessionId,
        cast_at: Timestamp,
    ) -> RecordResult {
        let mut state = self.state();

        if let Some(existing) = state
            .holding
            .get(voter)
            .and_then(|id| state.ballots.get(id))
            .filter(|b| b.status.holds_vote())
        {
            tracing::debug!(voter = %voter, ballot = %existing.id, "voter already holds a ballot");
            return RecordResult {
                accepted: false,
                ballot: existing.clone(),
            };
        }

        state.next_id += 1;
        let ballot = Ballot {
            id: BallotId::new(state.next_id),
            voter: voter.clone(),
            candidate: candidate.clone(),
            cast_at,
            session: session.clone(),
            status: BallotStatus::Pending,
        };
        state.holding.insert(voter.clone(), ballot.id);
        state.ballots.insert(ballot.id, ballot.clone());
        tracing::debug!(voter = %voter, ballot = %ballot.id, candidate = %candidate, "pending ballot recorded");

        RecordResult {
            accepted: true,
            ballot,
        }
    }

    /// Move a pending ballot to `Confirmed`. Returns the ballot's resulting
    /// status; an already-terminal ballot is left untouched.
    pub fn confirm(&self, id: BallotId) -> Result<BallotStatus, LedgerError> {
        self.finish(id, BallotStatus::Confirmed)
    }

    /// Move a pending ballot to `Rejected`, freeing the voter to vote again.
    /// Returns the ballot's resulting status; an already-terminal ballot is
    /// left untouched.
    pub fn reject(&self, id: BallotId) -> Result<BallotStatus, LedgerError> {
        self.finish(id, BallotStatus::Rejected)
    }

    fn finish(&self, id: BallotId, target: BallotStatus) -> Result<BallotStatus, LedgerError> {
        let mut state = self.state();
        let ballot = state
            .ballots
            .get_mut(&id)
            .ok_or(LedgerError::BallotNotFound(id))?;

        if ballot.status.is_terminal() {
            return Ok(ballot.status);
        }
        ballot.status = target;
        let voter = ballot.voter.clone();

        if target == BallotStatus::Rejected && state.holding.get(&voter) == Some(&id) {
            state.holding.remove(&voter);
        }
        tracing::debug!(ballot = %id, voter = %voter, status = %target, "ballot finalized");
        Ok(target)
    }

    /// Confirmed ballots per candidate. Every candidate of the fixed set is
    /// present, with zero when nobody voted for it.
    pub fn tally(&self) -> BTreeMap<CandidateId, u64> {
        let mut tally: BTreeMap<CandidateId, u64> =
            self.candidates.ids().map(|id| (id.clone(), 0)).collect();
        let state = self.state();
        for ballot in state.ballots.values() {
            if ballot.status == BallotStatus::Confirmed {
                *tally.entry(ballot.candidate.clone()).or_insert(0) += 1;
            }
        }
        tally
    }

    /// Confirmed ballots for a single candidate.
    pub fn candidate_count(&self, candidate: &CandidateId) -> u64 {
        self.state()
            .ballots
            .values()
            .filter(|b| b.status == BallotStatus::Confirmed && &b.candidate == candidate)
            .count() as u64
    }

    pub fn ballot(&self, id: BallotId) -> Option<Ballot> {
        self.state().ballots.get(&id).cloned()
    }

    /// The voter's pending or confirmed ballot, if any.
    pub fn active_ballot(&self, voter: &VoterId) -> Option<Ballot> {
        let state = self.state();
        state
            .holding
            .get(voter)
            .and_then(|id| state.ballots.get(id))
            .cloned()
    }

    /// Whether the voter holds a confirmed ballot.
    pub fn has_voted(&self, voter: &VoterId) -> bool {
        self.active_ballot(voter)
            .is_some_and(|b| b.status == BallotStatus::Confirmed)
    }

    /// The authoritative storage record of a ballot.
    pub fn record(&self, id: BallotId) -> Option<BallotRecord> {
        self.state().ballots.get(&id).map(BallotRecord::from_ballot)
    }

    pub fn summary(&self) -> LedgerSummary {
        let state = self.state();
        let mut summary = LedgerSummary {
            voters: state.holding.len() as u64,
            ..LedgerSummary::default()
        };
        for ballot in state.ballots.values() {
            match ballot.status {
                BallotStatus::Pending => summary.pending += 1,
                BallotStatus::Confirmed => summary.confirmed += 1,
                BallotStatus::Rejected => summary.rejected += 1,
            }
        }
        summary
    }
}

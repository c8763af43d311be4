use ballot_types::{Clock, SessionId, Timestamp, VoterId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A live lease on one voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterLock {
    pub holder: SessionId,
    pub expires_at: Timestamp,
}

impl VoterLock {
    fn is_live(&self, now: Timestamp) -> bool {
        !self.expires_at.has_passed(now)
    }
}

/// Keyed mutex with expiry, one entry per voter with an admission in flight.
pub struct LockManager {
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<VoterId, VoterLock>>,
}

impl LockManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<VoterId, VoterLock>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try once to take the voter's lock for `lease`.
    ///
    /// Returns `false` when any live lease holds the voter, including one
    /// held by `session` itself. An expired lease is taken over.
    pub fn acquire(&self, voter: &VoterId, session: &SessionId, lease: Duration) -> bool {
        let now = self.clock.now();
        let mut table = self.table();

        if let Some(current) = table.get(voter) {
            if current.is_live(now) {
                tracing::debug!(voter = %voter, holder = %current.holder, "voter lock contended");
                return false;
            }
            tracing::warn!(
                voter = %voter,
                expired_holder = %current.holder,
                session = %session,
                "taking over expired voter lease"
            );
        }

        table.insert(
            voter.clone(),
            VoterLock {
                holder: session.clone(),
                expires_at: now.plus(lease),
            },
        );
        tracing::debug!(
            voter = %voter,
            session = %session,
            lease_ms = lease.as_millis() as u64,
            "voter lock acquired"
        );
        true
    }

    /// Release the voter's lock if `session` holds a live lease on it.
    pub fn release(&self, voter: &VoterId, session: &SessionId) -> bool {
        let now = self.clock.now();
        let mut table = self.table();

        match table.get(voter) {
            Some(current) if !current.is_live(now) => {
                tracing::warn!(voter = %voter, session = %session, "voter lease expired before release");
                table.remove(voter);
                false
            }
            Some(current) if &current.holder == session => {
                table.remove(voter);
                tracing::debug!(voter = %voter, session = %session, "voter lock released");
                true
            }
            Some(current) => {
                tracing::warn!(
                    voter = %voter,
                    session = %session,
                    holder = %current.holder,
                    "refusing release by non-holder"
                );
                false
            }
            None => false,
        }
    }

    /// Whether a live lease holds the voter.
    pub fn is_locked(&self, voter: &VoterId) -> bool {
        self.live(voter).is_some()
    }

    /// Current holder of the voter's live lease.
    pub fn holder(&self, voter: &VoterId) -> Option<SessionId> {
        self.live(voter).map(|lock| lock.holder)
    }

    /// Time left on the voter's live lease.
    pub fn remaining_lease(&self, voter: &VoterId) -> Option<Duration> {
        let now = self.clock.now();
        self.live(voter).map(|lock| now.elapsed_since(lock.expires_at))
    }

    /// Drop the voter's lock regardless of holder. Returns whether a live
    /// lease was removed.
    pub fn force_release(&self, voter: &VoterId) -> bool {
        let now = self.clock.now();
        let removed = self.table().remove(voter);
        let was_live = removed.is_some_and(|lock| lock.is_live(now));
        if was_live {
            tracing::warn!(voter = %voter, "voter lock force-released");
        }
        was_live
    }

    /// Number of live leases.
    pub fn active_locks(&self) -> usize {
        self.purge_expired();
        self.table().len()
    }

    /// Remove every expired lease. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, lock| lock.is_live(now));
        before - table.len()
    }

    /// The voter's lease if still live; an expired entry is cleared on the way.
    fn live(&self, voter: &VoterId) -> Option<VoterLock> {
        let now = self.clock.now();
        let mut table = self.table();
        match table.get(voter) {
            Some(lock) if lock.is_live(now) => Some(lock.clone()),
            Some(_) => {
                table.remove(voter);
                None
            }
            None => None,
        }
    }
}

//! Nullable replica — an in-memory replica with fault injection.

use async_trait::async_trait;
use ballot_store::{ReplicaRecord, ReplicaStore, StoreError};
use ballot_types::{BallotId, CandidateId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a [`NullReplica`] answers writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicaBehavior {
    /// Store the copy and acknowledge immediately.
    Healthy,
    /// Refuse every write with an error.
    Failing,
    /// Never answer; the caller's timeout decides.
    Hanging,
    /// Store the copy and acknowledge after a delay.
    Delayed(Duration),
}

/// An in-memory replica whose behaviour tests can change at any time.
pub struct NullReplica {
    records: Mutex<HashMap<BallotId, ReplicaRecord>>,
    behavior: Mutex<ReplicaBehavior>,
    reads_unreachable: AtomicBool,
    write_attempts: AtomicUsize,
}

impl NullReplica {
    pub fn new(behavior: ReplicaBehavior) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            behavior: Mutex::new(behavior),
            reads_unreachable: AtomicBool::new(false),
            write_attempts: AtomicUsize::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ReplicaBehavior::Healthy)
    }

    pub fn failing() -> Self {
        Self::new(ReplicaBehavior::Failing)
    }

    pub fn hanging() -> Self {
        Self::new(ReplicaBehavior::Hanging)
    }

    pub fn delayed(delay: Duration) -> Self {
        Self::new(ReplicaBehavior::Delayed(delay))
    }

    pub fn set_behavior(&self, behavior: ReplicaBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Make reads fail as if the replica were unreachable.
    pub fn set_reads_unreachable(&self, unreachable: bool) {
        self.reads_unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Overwrite the stored candidate of a copy, simulating divergence.
    pub fn tamper(&self, ballot: BallotId, candidate: CandidateId) {
        if let Some(copy) = self.records.lock().unwrap().get_mut(&ballot) {
            copy.record.candidate = candidate;
        }
    }

    /// Number of write calls received, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Number of copies stored.
    pub fn stored(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn store(&self, record: &ReplicaRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.record.ballot, record.clone());
    }
}

impl Default for NullReplica {
    fn default() -> Self {
        Self::healthy()
    }
}

#[async_trait]
impl ReplicaStore for NullReplica {
    async fn write(&self, record: &ReplicaRecord) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            ReplicaBehavior::Healthy => {
                self.store(record);
                Ok(())
            }
            ReplicaBehavior::Failing => Err(StoreError::WriteRejected(format!(
                "{} refused by null replica",
                record.record.ballot
            ))),
            ReplicaBehavior::Hanging => std::future::pending().await,
            ReplicaBehavior::Delayed(delay) => {
                tokio::time::sleep(delay).await;
                self.store(record);
                Ok(())
            }
        }
    }

    async fn read(&self, ballot: BallotId) -> Result<Option<ReplicaRecord>, StoreError> {
        if self.reads_unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null replica unreachable".into()));
        }
        Ok(self.records.lock().unwrap().get(&ballot).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_store::{BallotRecord, ReplicaIndex};
    use ballot_types::{BallotStatus, Timestamp, VoterId};

    fn copy(ballot: u64) -> ReplicaRecord {
        ReplicaRecord {
            replica: ReplicaIndex::new(1),
            record: BallotRecord {
                ballot: BallotId::new(ballot),
                voter: VoterId::from("u1"),
                candidate: CandidateId::from("A"),
                status: BallotStatus::Confirmed,
                timestamp: Timestamp::new(1),
            },
        }
    }

    #[tokio::test]
    async fn failing_replica_stores_nothing() {
        let replica = NullReplica::failing();
        assert!(replica.write(&copy(1)).await.is_err());
        assert_eq!(replica.write_attempts(), 1);
        assert_eq!(replica.stored(), 0);
    }

    #[tokio::test]
    async fn behavior_can_change_between_writes() {
        let replica = NullReplica::failing();
        assert!(replica.write(&copy(1)).await.is_err());
        replica.set_behavior(ReplicaBehavior::Healthy);
        assert!(replica.write(&copy(1)).await.is_ok());
        assert_eq!(replica.stored(), 1);
    }

    #[tokio::test]
    async fn hanging_replica_never_answers() {
        let replica = NullReplica::hanging();
        let result =
            tokio::time::timeout(Duration::from_millis(20), replica.write(&copy(1))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unreachable_reads_error_and_tamper_diverges() {
        let replica = NullReplica::healthy();
        replica.write(&copy(1)).await.unwrap();
        replica.tamper(BallotId::new(1), CandidateId::from("B"));
        let read = replica.read(BallotId::new(1)).await.unwrap().unwrap();
        assert_eq!(read.record.candidate, CandidateId::from("B"));

        replica.set_reads_unreachable(true);
        assert!(replica.read(BallotId::new(1)).await.is_err());
    }
}

//! The uniform replica storage interface.

use async_trait::async_trait;
use ballot_types::BallotId;

use crate::{ReplicaRecord, StoreError};

/// A storage replica reachable through a single write/read interface.
///
/// Implementations may block on I/O; the coordinator bounds every call with
/// its own timeout and never retries a failed call.
#[async_trait]
pub trait ReplicaStore: Send + Sync {
    /// Persist a replica copy, overwriting any earlier copy of the same ballot.
    async fn write(&self, record: &ReplicaRecord) -> Result<(), StoreError>;

    /// Read back this replica's copy of a ballot, if it holds one.
    async fn read(&self, ballot: BallotId) -> Result<Option<ReplicaRecord>, StoreError>;
}

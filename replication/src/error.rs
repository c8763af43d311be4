use ballot_types::BallotId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error("replication requires at least one replica")]
    EmptyReplicaSet,

    #[error("ballot not found in ledger: {0}")]
    UnknownBallot(BallotId),
}

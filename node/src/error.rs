use ballot_types::RequestId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] ballot_ledger::LedgerError),

    #[error("replication error: {0}")]
    Replication(#[from] ballot_replication::ReplicationError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a request could not be handed to the scheduler, or why its outcome
/// never arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("scheduler saturated: queue holds {capacity} requests")]
    SchedulerSaturated { capacity: usize },

    #[error("scheduler is shutting down")]
    ShuttingDown,

    #[error("worker dropped {0} before reporting an outcome")]
    WorkerLost(RequestId),
}

use ballot_types::BallotId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ballot not found: {0}")]
    BallotNotFound(BallotId),
}

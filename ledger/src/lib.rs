//! Vote ledger.
//!
//! The authoritative record of admitted ballots: at most one non-rejected
//! ballot per voter, check-and-insert in one atomic step, idempotent terminal
//! transitions and a tally that counts confirmed ballots only.

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::{LedgerSummary, RecordResult, VoteLedger};

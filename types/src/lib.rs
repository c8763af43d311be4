//! Fundamental types for the ballot admission pipeline.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! voter and candidate identities, ballots and their status, admission requests,
//! timestamps and clocks, and the terminal outcome of a vote submission.

pub mod ballot;
pub mod candidate;
pub mod error;
pub mod id;
pub mod request;
pub mod time;

pub use ballot::{Ballot, BallotStatus};
pub use candidate::CandidateSet;
pub use error::{RejectReason, VoteOutcome};
pub use id::{BallotId, CandidateId, RequestId, SessionId, VoterId};
pub use request::AdmissionRequest;
pub use time::{Clock, SystemClock, Timestamp};

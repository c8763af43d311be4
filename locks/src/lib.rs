//! Per-voter locks with lease expiry.
//!
//! A voter's lock is a lease: a holder session plus an expiry instant.
//! Acquisition is try-once and never waits. Expired leases are cleared
//! lazily whenever the table is read, so a crashed worker can strand a
//! voter for at most one lease duration.

pub mod manager;

pub use manager::{LockManager, VoterLock};

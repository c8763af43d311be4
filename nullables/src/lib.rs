//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the pipeline (the clock and the storage
//! replicas) are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (advance time, inject faults)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod replica;

pub use clock::NullClock;
pub use replica::{NullReplica, ReplicaBehavior};

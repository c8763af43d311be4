//! Quorum replication.
//!
//! A ballot is fanned out to every configured replica concurrently, one
//! attempt per replica, each bounded by a timeout. The ballot is durable once
//! a strict majority (`replicas / 2 + 1`, integer division) acknowledges.

pub mod consistency;
pub mod coordinator;
pub mod error;
pub mod quorum;

pub use consistency::ConsistencyReport;
pub use coordinator::{
    ReplicaFailure, ReplicaWriteResult, ReplicationConfig, ReplicationCoordinator,
    ReplicationReport, ReplicationStats,
};
pub use error::ReplicationError;
pub use quorum::{quorum_size, QuorumDecision, QuorumTracker};

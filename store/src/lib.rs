//! Persisted state layout and the replica storage interface.
//!
//! Every replica backend (in-process, remote, fault-injecting fakes for
//! testing) implements [`ReplicaStore`]. The replication coordinator depends
//! only on the trait.

pub mod error;
pub mod memory;
pub mod record;
pub mod replica;

pub use error::StoreError;
pub use memory::MemoryReplica;
pub use record::{BallotRecord, ReplicaIndex, ReplicaRecord};
pub use replica::ReplicaStore;

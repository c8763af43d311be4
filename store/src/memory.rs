//! In-process replica backend.

use async_trait::async_trait;
use ballot_types::BallotId;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::{ReplicaRecord, ReplicaStore, StoreError};

/// A replica that keeps its copies in memory, optionally after a fixed
/// simulated write latency.
pub struct MemoryReplica {
    records: Mutex<HashMap<BallotId, ReplicaRecord>>,
    latency: Duration,
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            latency,
        }
    }

    /// Number of ballot copies held.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicaStore for MemoryReplica {
    async fn write(&self, record: &ReplicaRecord) -> Result<(), StoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.record.ballot, record.clone());
        Ok(())
    }

    async fn read(&self, ballot: BallotId) -> Result<Option<ReplicaRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&ballot)
            .cloned())
    }
}

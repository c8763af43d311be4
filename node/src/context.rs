//! Everything an admission worker needs, passed explicitly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ballot_ledger::VoteLedger;
use ballot_locks::LockManager;
use ballot_replication::ReplicationCoordinator;
use ballot_types::Clock;

use crate::metrics::PipelineMetrics;
use crate::recently_processed::RecentlyProcessed;
use crate::stats::PipelineStats;

/// Shared pipeline state. Built once at startup and handed to every worker
/// behind an `Arc`; there are no process-wide singletons.
pub struct PipelineContext {
    pub ledger: VoteLedger,
    pub locks: LockManager,
    pub replication: ReplicationCoordinator,
    pub stats: PipelineStats,
    pub metrics: PipelineMetrics,
    pub clock: Arc<dyn Clock>,
    /// Lease taken on a voter's lock for one admission.
    pub lease: Duration,
    processed: Mutex<RecentlyProcessed>,
}

impl PipelineContext {
    pub fn new(
        ledger: VoteLedger,
        replication: ReplicationCoordinator,
        clock: Arc<dyn Clock>,
        lease: Duration,
        processed_cache_capacity: usize,
    ) -> Self {
        Self {
            ledger,
            locks: LockManager::new(clock.clone()),
            replication,
            stats: PipelineStats::new(),
            metrics: PipelineMetrics::new(),
            clock,
            lease,
            processed: Mutex::new(RecentlyProcessed::new(processed_cache_capacity)),
        }
    }

    pub(crate) fn processed(&self) -> MutexGuard<'_, RecentlyProcessed> {
        self.processed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

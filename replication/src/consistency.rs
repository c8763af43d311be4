//! Read-back consistency checks. Diagnostics only, never on the write path.

use ballot_ledger::VoteLedger;
use ballot_store::ReplicaIndex;
use ballot_types::BallotId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::{ReplicationCoordinator, ReplicationError};

/// How the replicas' copies of a ballot compare with the ledger's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub ballot: BallotId,
    /// True when at least one copy was read and every copy read matches.
    pub consistent: bool,
    pub agreeing_replicas: usize,
    /// Replicas that answered with a copy.
    pub total_replicas: usize,
    /// Replicas that answered without holding a copy.
    pub missing: Vec<ReplicaIndex>,
    /// Replicas that failed or timed out on read.
    pub unreachable: Vec<ReplicaIndex>,
}

impl ConsistencyReport {
    /// Percentage of read copies agreeing with the ledger.
    pub fn consistency_rate(&self) -> f64 {
        match self.total_replicas {
            0 => 0.0,
            total => self.agreeing_replicas as f64 / total as f64 * 100.0,
        }
    }
}

enum ReadBack {
    Agrees,
    Differs,
    Missing,
    Unreachable,
}

impl ReplicationCoordinator {
    /// Read the ballot back from every replica and compare each copy with
    /// the ledger's authoritative record.
    pub async fn check_consistency(
        &self,
        ballot: BallotId,
        ledger: &VoteLedger,
    ) -> Result<ConsistencyReport, ReplicationError> {
        let expected = ledger
            .record(ballot)
            .ok_or(ReplicationError::UnknownBallot(ballot))?;
        let timeout = self.config().read_timeout;
        let mut tasks = JoinSet::new();

        for (index, replica) in self.replicas().iter().enumerate() {
            let replica = Arc::clone(replica);
            let expected = expected.clone();
            tasks.spawn(async move {
                let index = ReplicaIndex::new(index);
                let read = match tokio::time::timeout(timeout, replica.read(ballot)).await {
                    Ok(Ok(Some(copy))) if copy.record == expected => ReadBack::Agrees,
                    Ok(Ok(Some(_))) => ReadBack::Differs,
                    Ok(Ok(None)) => ReadBack::Missing,
                    Ok(Err(e)) => {
                        tracing::debug!(ballot = %ballot, replica = %index, error = %e, "replica read failed");
                        ReadBack::Unreachable
                    }
                    Err(_) => ReadBack::Unreachable,
                };
                (index, read)
            });
        }

        let mut report = ConsistencyReport {
            ballot,
            consistent: false,
            agreeing_replicas: 0,
            total_replicas: 0,
            missing: Vec::new(),
            unreachable: Vec::new(),
        };
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, read)) = joined else {
                continue;
            };
            match read {
                ReadBack::Agrees => {
                    report.agreeing_replicas += 1;
                    report.total_replicas += 1;
                }
                ReadBack::Differs => {
                    tracing::warn!(ballot = %ballot, replica = %index, "replica copy diverges from ledger");
                    report.total_replicas += 1;
                }
                ReadBack::Missing => report.missing.push(index),
                ReadBack::Unreachable => report.unreachable.push(index),
            }
        }
        report.missing.sort();
        report.unreachable.sort();
        report.consistent =
            report.total_replicas > 0 && report.agreeing_replicas == report.total_replicas;

        tracing::debug!(
            ballot = %ballot,
            consistent = report.consistent,
            agreeing = report.agreeing_replicas,
            total = report.total_replicas,
            "consistency check finished"
        );
        Ok(report)
    }
}

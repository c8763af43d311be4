//! Pipeline configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use ballot_replication::ReplicationConfig;
use ballot_types::{CandidateId, CandidateSet};

use crate::logging::LogFormat;
use crate::NodeError;

/// A candidate entry in the ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub id: String,
    pub name: String,
}

impl CandidateConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Configuration for a ballot admission node.
///
/// Can be loaded from a TOML file via [`PipelineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent admission workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum number of requests waiting for a worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of replica targets each ballot is written to.
    #[serde(default = "default_replica_count")]
    pub replica_count: usize,

    /// Per-replica write deadline, in milliseconds.
    #[serde(default = "default_replica_write_timeout_ms")]
    pub replica_write_timeout_ms: u64,

    /// Per-replica read deadline used by consistency checks, in milliseconds.
    #[serde(default = "default_replica_read_timeout_ms")]
    pub replica_read_timeout_ms: u64,

    /// Voter lock lease, in milliseconds. Must cover the replica write deadline.
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,

    /// How many completed request ids are remembered for duplicate delivery.
    #[serde(default = "default_processed_cache_capacity")]
    pub processed_cache_capacity: usize,

    /// Simulated latency of the in-memory replicas, in milliseconds.
    #[serde(default)]
    pub replica_latency_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The fixed candidate list for this ballot.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<CandidateConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_replica_count() -> usize {
    3
}

fn default_replica_write_timeout_ms() -> u64 {
    5_000
}

fn default_replica_read_timeout_ms() -> u64 {
    1_000
}

fn default_lease_ms() -> u64 {
    10_000
}

fn default_processed_cache_capacity() -> usize {
    4096
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_candidates() -> Vec<CandidateConfig> {
    vec![
        CandidateConfig::new("1", "Alice"),
        CandidateConfig::new("2", "Bob"),
        CandidateConfig::new("3", "Charlie"),
    ]
}

// ── Impl ───────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.worker_count == 0 {
            return Err(NodeError::Config("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be at least 1".into()));
        }
        if self.replica_count == 0 {
            return Err(NodeError::Config("replica_count must be at least 1".into()));
        }
        if self.replica_write_timeout_ms == 0 || self.replica_read_timeout_ms == 0 {
            return Err(NodeError::Config("replica timeouts must be non-zero".into()));
        }
        if self.lease_ms < self.replica_write_timeout_ms {
            return Err(NodeError::Config(format!(
                "lease_ms ({}) must be at least replica_write_timeout_ms ({})",
                self.lease_ms, self.replica_write_timeout_ms
            )));
        }
        if self.candidates.is_empty() {
            return Err(NodeError::Config("at least one candidate is required".into()));
        }
        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !seen.insert(candidate.id.as_str()) {
                return Err(NodeError::Config(format!(
                    "duplicate candidate id {:?}",
                    candidate.id
                )));
            }
        }
        Ok(())
    }

    pub fn candidate_set(&self) -> CandidateSet {
        CandidateSet::new(
            self.candidates
                .iter()
                .map(|c| (CandidateId::new(c.id.clone()), c.name.clone())),
        )
    }

    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }

    pub fn replica_latency(&self) -> Duration {
        Duration::from_millis(self.replica_latency_ms)
    }

    pub fn replication_config(&self) -> ReplicationConfig {
        ReplicationConfig {
            write_timeout: Duration::from_millis(self.replica_write_timeout_ms),
            read_timeout: Duration::from_millis(self.replica_read_timeout_ms),
        }
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            replica_count: default_replica_count(),
            replica_write_timeout_ms: default_replica_write_timeout_ms(),
            replica_read_timeout_ms: default_replica_read_timeout_ms(),
            lease_ms: default_lease_ms(),
            processed_cache_capacity: default_processed_cache_capacity(),
            replica_latency_ms: 0,
            log_format: default_log_format(),
            log_level: default_log_level(),
            candidates: default_candidates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml_string().expect("should serialize");
        let parsed = PipelineConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.worker_count, config.worker_count);
        assert_eq!(parsed.candidates, config.candidates);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.replica_count, 3);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.log_format, "human");
        assert_eq!(config.candidates.len(), 3);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            worker_count = 8
            replica_count = 5

            [[candidates]]
            id = "yes"
            name = "Yes"

            [[candidates]]
            id = "no"
            name = "No"
        "#;
        let config = PipelineConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.replica_count, 5);
        assert_eq!(config.lease_ms, 10_000); // default
        let set = config.candidate_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set.name(&CandidateId::from("yes")), Some("Yes"));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = PipelineConfig::from_toml_file("/nonexistent/ballot.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = PipelineConfig {
            worker_count: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_lease_shorter_than_write_timeout() {
        let config = PipelineConfig {
            lease_ms: 1_000,
            replica_write_timeout_ms: 5_000,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_candidates() {
        let config = PipelineConfig {
            candidates: vec![
                CandidateConfig::new("1", "Alice"),
                CandidateConfig::new("1", "Alicia"),
            ],
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_candidate_list() {
        let config = PipelineConfig {
            candidates: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Ballot admission node.
//!
//! Accepts vote submissions into a bounded, timestamp-ordered queue and
//! runs each one through a fixed pool of workers:
//! - Per-voter lease locks serialize admissions of the same voter
//! - The vote ledger enforces one live ballot per voter
//! - Quorum replication makes a ballot durable before it is confirmed
//! - Every submission ends Confirmed, Rejected (with a reason) or Saturated

pub mod admission;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod queue;
pub mod recently_processed;
pub mod scheduler;
pub mod shutdown;
pub mod stats;
pub mod tracing_spans;

pub use admission::admit;
pub use config::{CandidateConfig, PipelineConfig};
pub use context::PipelineContext;
pub use error::{NodeError, SubmitError};
pub use logging::{init_logging, LogFormat};
pub use metrics::PipelineMetrics;
pub use node::VotingNode;
pub use queue::AdmissionQueue;
pub use recently_processed::{Delivery, RecentlyProcessed};
pub use scheduler::{AdmissionScheduler, PendingAdmission};
pub use shutdown::ShutdownController;
pub use stats::{PipelineStats, StatsSnapshot};

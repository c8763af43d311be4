//! Ballot daemon — entry point for running an admission node.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio::task::JoinSet;

use ballot_node::{init_logging, PipelineConfig, ShutdownController, StatsSnapshot, VotingNode};
use ballot_types::{CandidateId, VoteOutcome, VoterId};

#[derive(Parser)]
#[command(name = "ballot-daemon", about = "Ballot admission node daemon")]
struct Cli {
    /// Number of admission workers.
    #[arg(long, env = "BALLOT_WORKERS")]
    workers: Option<usize>,

    /// Admission queue capacity.
    #[arg(long, env = "BALLOT_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Number of replicas each ballot is written to.
    #[arg(long, env = "BALLOT_REPLICAS")]
    replicas: Option<usize>,

    /// Simulated latency of each in-memory replica, in milliseconds.
    #[arg(long, env = "BALLOT_REPLICA_LATENCY_MS")]
    replica_latency_ms: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node until SIGINT/SIGTERM, logging stats periodically.
    Run {
        /// Seconds between stats log lines.
        #[arg(long, default_value_t = 10)]
        stats_interval: u64,
    },
    /// Submit one vote per voter concurrently and report the results as JSON.
    Stress {
        /// Number of distinct voters.
        #[arg(long, default_value_t = 1000)]
        voters: usize,

        /// Votes submitted per voter; anything past the first is a duplicate.
        #[arg(long, default_value_t = 1)]
        attempts: usize,

        /// Also print the Prometheus metrics text after the report.
        #[arg(long)]
        metrics: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Serialize)]
struct StressReport {
    voters: usize,
    submissions: usize,
    elapsed_ms: u128,
    throughput_per_sec: f64,
    outcomes: BTreeMap<String, u64>,
    tally: BTreeMap<String, u64>,
    stats: StatsSnapshot,
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            PipelineConfig::from_toml_file(&path)
                .with_context(|| format!("loading config from {path}"))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.queue_capacity = capacity;
    }
    if let Some(replicas) = cli.replicas {
        config.replica_count = replicas;
    }
    if let Some(latency) = cli.replica_latency_ms {
        config.replica_latency_ms = latency;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

fn outcome_label(outcome: &VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::Confirmed(_) => "confirmed",
        VoteOutcome::Rejected(reason) => reason.code(),
        VoteOutcome::Saturated => "saturated",
    }
}

async fn run(config: &PipelineConfig, stats_interval: Duration) -> anyhow::Result<()> {
    let node = VotingNode::with_memory_replicas(config)?;
    let shutdown = Arc::new(ShutdownController::new());
    let mut stop = shutdown.subscribe();

    let signals = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_signal().await {
            tracing::error!(error = %e, "failed to listen for shutdown signals");
            signals.shutdown();
        }
    });

    let mut ticker = tokio::time::interval(stats_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = node.stats();
                tracing::info!(
                    total = stats.total_requests,
                    confirmed = stats.confirmed,
                    rejected = stats.rejected,
                    saturated = stats.saturated,
                    queue_depth = stats.queue_depth,
                    active_locks = stats.active_locks,
                    "pipeline stats"
                );
            }
            _ = stop.recv() => break,
        }
    }

    node.shutdown().await;
    tracing::info!("ballot daemon exited cleanly");
    Ok(())
}

async fn stress(
    config: &PipelineConfig,
    voters: usize,
    attempts: usize,
    print_metrics: bool,
) -> anyhow::Result<()> {
    let node = Arc::new(VotingNode::with_memory_replicas(config)?);
    let candidates: Vec<CandidateId> = node.context().ledger.candidates().ids().cloned().collect();

    let started = Instant::now();
    let mut tasks = JoinSet::new();
    for i in 0..voters {
        for _ in 0..attempts.max(1) {
            let node = node.clone();
            let voter = VoterId::new(format!("voter-{i}"));
            let candidate = candidates[i % candidates.len()].clone();
            tasks.spawn(async move { node.submit_vote(voter, candidate).await });
        }
    }

    let mut outcomes: BTreeMap<String, u64> = BTreeMap::new();
    let mut submissions = 0;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.context("stress task panicked")??;
        *outcomes.entry(outcome_label(&outcome).to_string()).or_default() += 1;
        submissions += 1;
    }
    let elapsed = started.elapsed();
    node.shutdown().await;

    let report = StressReport {
        voters,
        submissions,
        elapsed_ms: elapsed.as_millis(),
        throughput_per_sec: submissions as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        outcomes,
        tally: node
            .tally()
            .into_iter()
            .map(|(candidate, count)| (candidate.to_string(), count))
            .collect(),
        stats: node.stats(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if print_metrics {
        println!("{}", node.context().metrics.encode());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)?;

    match cli.command {
        Command::Run { stats_interval } => {
            tracing::info!(
                workers = config.worker_count,
                replicas = config.replica_count,
                queue_capacity = config.queue_capacity,
                "starting ballot node"
            );
            run(&config, Duration::from_secs(stats_interval.max(1))).await?;
        }
        Command::Stress {
            voters,
            attempts,
            metrics,
        } => stress(&config, voters, attempts, metrics).await?,
        Command::Config => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}

//! Domino
//!
//! Operator CLI for the referral commission ledger: registers users and
//! deposits, fires the deposit-approval trigger, and settles commissions.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use domino_core::config::{self, load_config};
use domino_engine::cli::{self, Command};
use domino_engine::commission::CommissionEngine;
use domino_engine::storage::Database;

#[derive(Parser, Debug)]
#[command(name = "domino")]
#[command(version, about = "Domino referral commission engine")]
struct Args {
    /// Config file (JSON), layered over the global settings.
    #[arg(long, env = "DOMINO_CONFIG")]
    config: Option<PathBuf>,

    /// Database file path
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "DOMINO_LOG_JSON")]
    log_json: bool,

    /// OpenTelemetry OTLP endpoint for traces and metrics export
    /// (e.g. `http://localhost:4317`). Requires the `metrics` feature.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "DOMINO_METRICS_ENDPOINT")]
    metrics_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        config.logging.log_level = level;
    }
    if let Some(path) = args.db_path {
        config.storage.database_path = Some(path);
    }

    #[cfg(feature = "metrics")]
    let metrics_endpoint = args.metrics_endpoint.as_deref();
    #[cfg(not(feature = "metrics"))]
    let metrics_endpoint: Option<&str> = None;

    // Hold the guard so the OTel pipeline stays alive for the process lifetime.
    let log_filter = format!(
        "domino={level},domino_engine={level},domino_core={level}",
        level = config.logging.log_level
    );
    let telemetry_guard = domino_core::tracing_init::init_tracing_with_metrics(
        &log_filter,
        args.log_json || config.logging.log_json,
        metrics_endpoint,
    );

    let db_path = match config.storage.database_path.clone() {
        Some(path) => path,
        None => config::database_path()
            .or_else(|| dirs::home_dir().map(|h| h.join(".domino").join("domino.db")))
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %db_path.display(),
        "Opening ledger database"
    );
    let db = Database::open(&db_path).await?;

    let engine = CommissionEngine::new(db, config.engine);
    let result = {
        let mut stdout = std::io::stdout().lock();
        cli::run(args.command, &engine, &mut stdout).await
    };

    #[cfg(feature = "metrics")]
    if let Some(guard) = telemetry_guard
        && let Err(e) = guard.shutdown()
    {
        tracing::warn!(error = %e, "OpenTelemetry shutdown failed");
    }
    #[cfg(not(feature = "metrics"))]
    let () = telemetry_guard;

    result
}

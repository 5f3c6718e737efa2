//! Zigmend - Main entry point
//!
//! Harvests device metadata from the configured sources, reconciles it
//! against the local driver registry, runs the validate/remediate cycle,
//! and writes the run report. The exit status reflects the report: 0 only
//! when no issues remain and the run was not cancelled.

mod config;
mod orchestrator;
mod report;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "zigmend")]
#[command(about = "Device-metadata harvesting and driver-registry remediation")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "zigmend.toml")]
    config: PathBuf,

    /// Override the registry directory
    #[arg(short, long)]
    registry: Option<String>,

    /// Override the report output path
    #[arg(long)]
    report: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write an example configuration file and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Zigmend v{}", env!("CARGO_PKG_VERSION"));

    if args.init {
        config::save_default_config(&args.config)?;
        println!("Wrote example configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;
    if let Some(registry) = args.registry {
        config.registry.path = registry;
    }
    if let Some(report) = args.report {
        config.report.path = report;
    }

    if config.sources.is_empty() {
        warn!("No sources configured; the registry gap analysis will see no harvested records");
    }

    info!(
        sources = config.sources.len(),
        registry = %config.registry.path,
        "Configuration loaded"
    );

    // Ctrl-C flips the cancellation signal; the orchestrator jumps to
    // Reporting and the report carries cancelled = true.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, finishing with a partial report");
            let _ = cancel_tx.send(true);
        }
    });

    let orchestrator = orchestrator::Orchestrator::new(config, cancel_rx);
    let report = orchestrator.run().await?;

    println!("{}", report.summary());

    // Callers decide pass/fail from this alone.
    if report.success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

//! Ratewatch CLI
//!
//! Drives a currency watchlist from a script or from stdin, fetching rates
//! from a JSON rate table.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod scenario;
mod state;
mod transport;

use controller::{RunOptions, WatchlistController};
use ratewatch_watchlist::WatchlistConfig;
use scenario::{Scenario, ScenarioStep};

/// Ratewatch CLI
#[derive(Parser, Debug)]
#[command(name = "ratewatch")]
#[command(about = "Currency watchlist with live multi-way conversion")]
struct Args {
    /// JSON rate table served as the remote rate source
    #[arg(short, long)]
    rates: PathBuf,

    /// JSON file holding the persisted catalog and watchlist
    #[arg(long)]
    state: Option<PathBuf>,

    /// Scenario file to run instead of reading commands from stdin
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Start with no connectivity
    #[arg(long)]
    offline: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = WatchlistConfig::from_env();
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!("Starting Ratewatch");

    let options = RunOptions {
        rates: args.rates,
        state: args.state,
        offline: args.offline,
    };
    let mut controller = WatchlistController::start(&options, &config)
        .await
        .context("Failed to start watchlist")?;

    if let Some(path) = &args.scenario {
        let scenario = Scenario::load(path).with_context(|| format!("Failed to load scenario {}", path.display()))?;
        controller.run_scenario(&scenario).await?;
    } else {
        info!("Reading commands from stdin");
        controller.execute_step(&ScenarioStep::Refresh).await;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "quit" | "exit") {
                break;
            }
            match line.parse::<ScenarioStep>() {
                Ok(step) => controller.execute_step(&step).await,
                Err(e) => println!("error: {}", e),
            }
        }
        controller.session().flush().await?;
    }

    info!("Ratewatch stopped");
    Ok(())
}

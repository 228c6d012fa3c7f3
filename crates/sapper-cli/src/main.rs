//! Sapper CLI - arena bot tactical planning engine.
//!
//! Single binary that provides:
//! - `sapper run` - play the current round
//! - `sapper rounds` - show the round schedule
//! - `sapper config` - print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use sapper_core::{ArenaApi, Bot, EngineConfig, HttpArenaClient};

#[derive(Parser)]
#[command(name = "sapper")]
#[command(about = "Arena bot tactical planning engine", version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the arena and play
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Show the round schedule
    Rounds,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };

    match cli.command {
        Commands::Run { ticks } => run_bot(config, ticks).await,
        Commands::Rounds => show_rounds(config).await,
        Commands::Config => {
            let rendered =
                serde_yaml::to_string(&config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn run_bot(config: EngineConfig, ticks: Option<u64>) -> Result<()> {
    tracing::info!(base_url = %config.api.base_url, "Starting bot");
    if config.api.token.is_none() {
        tracing::warn!("No API token configured; set ARENA_TOKEN");
    }

    let client = HttpArenaClient::new(&config.api, config.rules.tick_interval_ms)
        .context("Failed to build arena client")?;
    let api: Arc<dyn ArenaApi> = Arc::new(client);
    let mut bot = Bot::new(config, api);

    match ticks {
        Some(ticks) => bot.run_ticks(ticks).await,
        None => bot.run().await,
    }
    Ok(())
}

async fn show_rounds(config: EngineConfig) -> Result<()> {
    let client = HttpArenaClient::new(&config.api, config.rules.tick_interval_ms)
        .context("Failed to build arena client")?;
    let rounds = client
        .fetch_round_schedule()
        .await
        .context("Failed to fetch round schedule")?;

    if rounds.is_empty() {
        println!("No rounds scheduled.");
        return Ok(());
    }
    for round in rounds {
        println!(
            "{:<24} {:<10} {} .. {}",
            round.name, round.status, round.start_at, round.end_at
        );
    }
    Ok(())
}

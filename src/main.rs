//! Mutiny - command-line entry point.

use anyhow::Result;
use clap::Parser;
use mutiny::{GameConfig, run_simulation};
use std::time::Duration;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mutiny=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            players,
            seed,
            config,
            limit_secs,
            json,
        } => simulate(players, seed, config, limit_secs, json).await,
        Command::Config => {
            print!("{}", GameConfig::default().to_toml()?);
            Ok(())
        }
    }
}

/// Runs a bot game and prints how it ended.
#[instrument(skip(config_path))]
async fn simulate(
    players: usize,
    seed: Option<u64>,
    config_path: Option<std::path::PathBuf>,
    limit_secs: u64,
    json: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GameConfig::from_file(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    info!(players, seed = ?config.seed(), "Starting simulation");
    let summary = run_simulation(config, players, Duration::from_secs(limit_secs)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        match summary.winner {
            Some(faction) => println!(
                "The {} won after {} turns at {}.",
                faction, summary.turns, summary.position
            ),
            None => println!(
                "No winner after {} turns; the ship drifted at {}.",
                summary.turns, summary.position
            ),
        }
    }
    Ok(())
}

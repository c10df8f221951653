//! Command-line interface for mutiny.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mutiny - hidden-role ship game engine
#[derive(Parser, Debug)]
#[command(name = "mutiny")]
#[command(about = "Rules engine for a hidden-role ship mutiny game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one game with bot players
    Simulate {
        /// Number of bots at the table
        #[arg(short, long, default_value = "6")]
        players: usize,

        /// Fixed RNG seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Path to a game config TOML file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds before the host ends an undecided game
        #[arg(long, default_value = "30")]
        limit_secs: u64,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default game config as TOML
    Config,
}

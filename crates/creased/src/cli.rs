//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crease - live Test match companion
#[derive(Parser, Debug)]
#[command(name = "creased")]
#[command(about = "Tracks a live Test match and answers questions about it", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $CREASE_CONFIG and /etc/crease/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand (if not provided, starts the interactive prompt)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question, e.g. "Can India draw?"
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Apply a JSON-lines event file before answering
        #[arg(long)]
        events: Option<PathBuf>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a JSON-lines event file and print each outcome
    Replay {
        file: PathBuf,
    },
}

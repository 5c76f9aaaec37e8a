//! Crease - live Test match state engine
//!
//! Ingests match events, keeps the authoritative match state and answers
//! questions about it from the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use crease_common::Config;
use tracing::info;

use creased::cli::{Cli, Commands};
use creased::{commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    info!("[BOOT] creased v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let dispatcher = commands::build_dispatcher(&config)?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Some(Commands::Ask {
            query,
            events,
            json,
        }) => {
            commands::run_ask(
                &config,
                &dispatcher,
                &query.join(" "),
                events.as_deref(),
                json,
                &mut stdout,
            )
            .await
        }
        Some(Commands::Replay { file }) => commands::run_replay(&config, &file, &mut stdout).await,
        None => {
            let state = config.initial_state().context("Invalid match setup")?;
            info!(
                "[BOOT] Match {}: {} chasing {} ({} ov)",
                state.match_id,
                state.score_line(),
                state.target,
                state.overs_played
            );
            commands::run_interactive(&config, &dispatcher).await
        }
    }
}

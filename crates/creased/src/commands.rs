//! Command execution for the `creased` binary.

use anyhow::{Context, Result};
use crease_common::{Config, MatchState, RawEvent};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::feed::{load_event_file, poll_feed, EventSource, HttpFeed};
use crate::history::{bootstrap, HttpHistory};
use crate::ingest::{ingest_channel, IngestHandle};
use crate::llm::{OpenAiGenerator, TextGenerator};
use crate::repl::{format_answer, run_repl};
use crate::state::{create_shared_state, StateReader};

/// Dispatcher for `config`, with the augmented path only when a credential
/// is present.
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let generator = OpenAiGenerator::from_config(&config.llm)
        .context("Failed to build text-generation client")?
        .map(|g| Arc::new(g) as Arc<dyn TextGenerator>);
    if generator.is_none() {
        info!("[BOOT] No LLM credential, answering deterministically");
    }
    Ok(Dispatcher::new(generator, &config.llm, &config.cache))
}

/// Submit `events` in order, writing one outcome line each when `out` is given.
async fn submit_all<W: Write>(
    handle: &IngestHandle,
    events: Vec<RawEvent>,
    mut out: Option<&mut W>,
) -> Result<(usize, usize)> {
    let (mut accepted, mut rejected) = (0, 0);
    for (idx, candidate) in events.into_iter().enumerate() {
        let line = match handle.submit(candidate).await {
            Ok(state) => {
                accepted += 1;
                format!(
                    "#{} accepted: {} ({} ov), P(Draw) {:.1}%",
                    idx + 1,
                    state.score_line(),
                    state.overs_played,
                    state.p_draw * 100.0
                )
            }
            Err(crate::error::IngestError::Closed) => {
                anyhow::bail!("Ingestion loop stopped during replay")
            }
            Err(e) => {
                rejected += 1;
                format!("#{} {}", idx + 1, e)
            }
        };
        if let Some(out) = out.as_deref_mut() {
            writeln!(out, "{}", line)?;
        }
    }
    Ok((accepted, rejected))
}

/// Replay an event file on top of `initial` and return the final state.
pub async fn replay_events<W: Write>(
    config: &Config,
    initial: MatchState,
    events: Vec<RawEvent>,
    out: Option<&mut W>,
) -> Result<Arc<MatchState>> {
    let (writer, reader) = create_shared_state(initial);
    let (ingestor, handle) = ingest_channel(writer, &config.engine);
    let task = tokio::spawn(ingestor.run());

    let (accepted, rejected) = submit_all(&handle, events, out).await?;
    drop(handle);
    task.await.context("Ingestion task failed")?;

    info!("[INGEST] Replay done: {} accepted, {} rejected", accepted, rejected);
    Ok(reader.snapshot().await)
}

/// `creased replay <file>`
pub async fn run_replay<W: Write>(config: &Config, file: &Path, out: &mut W) -> Result<()> {
    let initial = config.initial_state().context("Invalid match setup")?;
    let events = load_event_file(file)?;
    let last = replay_events(config, initial, events, Some(&mut *out)).await?;
    writeln!(
        out,
        "Final: {} in {} overs, target {}. P(Draw) {:.1}%",
        last.score_line(),
        last.overs_played,
        last.target,
        last.p_draw * 100.0
    )?;
    Ok(())
}

/// `creased ask <query>`
pub async fn run_ask<W: Write>(
    config: &Config,
    dispatcher: &Dispatcher,
    query: &str,
    events: Option<&Path>,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let initial = config.initial_state().context("Invalid match setup")?;
    let state = match events {
        Some(path) => {
            let events = load_event_file(path)?;
            replay_events::<W>(config, initial, events, None).await?
        }
        None => Arc::new(initial),
    };

    let answer = dispatcher.answer(query, &state).await;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&answer)?)?;
    } else {
        writeln!(out, "{}", format_answer(&answer, false))?;
    }
    Ok(())
}

/// Default mode: background ingestion plus the interactive prompt on stdin.
pub async fn run_interactive(config: &Config, dispatcher: &Dispatcher) -> Result<()> {
    let initial = config.initial_state().context("Invalid match setup")?;
    let (writer, reader) = create_shared_state(initial);
    let request_timeout = Duration::from_secs(config.feed.request_timeout_secs.max(1));

    if config.feed.fetch_history {
        match &config.feed.history_url {
            Some(url) => {
                let source = HttpHistory::new(url, request_timeout)
                    .context("Failed to build history client")?;
                bootstrap(&writer, &source).await;
            }
            None => info!("[BOOT] No history endpoint configured, skipping dismissal bootstrap"),
        }
    }

    let (ingestor, handle) = ingest_channel(writer, &config.engine);
    let ingest_task = tokio::spawn(ingestor.run());
    let poller = spawn_poller(config, handle, request_timeout)?;

    let color = std::io::stdout().is_terminal();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let result = run_repl(stdin, &mut stdout, dispatcher, &reader, color).await;

    if let Some(poller) = poller {
        poller.abort();
        let _ = poller.await;
    }
    if let Err(e) = ingest_task.await {
        warn!("[INGEST] Task ended abnormally: {}", e);
    }
    print_final(&reader).await;
    result
}

fn spawn_poller(
    config: &Config,
    handle: IngestHandle,
    request_timeout: Duration,
) -> Result<Option<tokio::task::JoinHandle<()>>> {
    if !config.feed.auto_poll {
        info!("[FEED] Auto polling disabled");
        return Ok(None);
    }
    let Some(url) = &config.feed.feed_url else {
        info!("[FEED] No feed endpoint configured, auto polling off");
        return Ok(None);
    };

    let source: Arc<dyn EventSource> =
        Arc::new(HttpFeed::new(url, request_timeout).context("Failed to build feed client")?);
    let interval = Duration::from_secs(config.feed.poll_interval_secs.max(1));
    Ok(Some(tokio::spawn(poll_feed(source, handle, interval))))
}

async fn print_final(reader: &StateReader) {
    let state = reader.snapshot().await;
    info!(
        "[BOOT] Shutting down at {} ({} ov)",
        state.score_line(),
        state.overs_played
    );
}

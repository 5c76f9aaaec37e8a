//! Upstream event feed.
//!
//! The poller only produces candidates. Everything it fetches goes through the
//! ingestion queue, so a failed or garbled fetch can never touch the state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use crease_common::RawEvent;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{FetchError, IngestError};
use crate::ingest::IngestHandle;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Latest event record, or `None` when the feed has nothing new.
    async fn fetch(&self) -> Result<Option<RawEvent>, FetchError>;
}

/// Feed endpoint returning one JSON event record per request
pub struct HttpFeed {
    http_client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl EventSource for HttpFeed {
    async fn fetch(&self) -> Result<Option<RawEvent>, FetchError> {
        let response = self.http_client.get(&self.url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Poll `source` every `interval`, queueing each new candidate.
///
/// A candidate identical to the previous one is skipped. Fetch errors are
/// logged and retried on the next tick. Returns once the ingestion loop has
/// gone away.
pub async fn poll_feed(source: Arc<dyn EventSource>, handle: IngestHandle, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last: Option<RawEvent> = None;

    info!("[FEED] Polling every {:?}", interval);

    loop {
        ticker.tick().await;

        let candidate = match source.fetch().await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                debug!("[FEED] Nothing new");
                continue;
            }
            Err(e) => {
                warn!("[FEED] Fetch failed, keeping last known state: {}", e);
                continue;
            }
        };

        if last.as_ref() == Some(&candidate) {
            debug!("[FEED] Same record as last poll, skipping");
            continue;
        }

        match handle.enqueue(candidate.clone()).await {
            Ok(()) => last = Some(candidate),
            Err(IngestError::Closed) => {
                info!("[FEED] Ingestion stopped, poller exiting");
                return;
            }
            Err(e) => warn!("[FEED] Could not queue candidate: {}", e),
        }
    }
}

/// Read a JSON-lines event file. Blank lines and `#` comments are skipped.
pub fn load_event_file(path: &Path) -> Result<Vec<RawEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;

    let mut events = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = RawEvent::from_json(line)
            .with_context(|| format!("{}:{}: not a JSON event record", path.display(), idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// Event source backed by a fixed list, one record per fetch, then `None`.
pub struct ScriptedSource {
    script: tokio::sync::Mutex<std::collections::VecDeque<Result<Option<RawEvent>, FetchError>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Option<RawEvent>, FetchError>>) -> Self {
        Self {
            script: tokio::sync::Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self) -> Result<Option<RawEvent>, FetchError> {
        self.script.lock().await.pop_front().unwrap_or(Ok(None))
    }
}

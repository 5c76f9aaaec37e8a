//! Historical dismissal bootstrap.
//!
//! Tracking usually starts mid-innings. Before the ingestion loop takes the
//! writer, dismissals that happened earlier can be fetched and seeded into the
//! initial state. Failure is never fatal: the engine then tracks dismissals
//! from the first wicket event onwards.

use async_trait::async_trait;
use crease_common::DismissedPlayer;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::FetchError;
use crate::state::StateWriter;

#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_dismissals(&self) -> Result<Vec<DismissedPlayer>, FetchError>;
}

/// Endpoint returning a JSON array of dismissal records
pub struct HttpHistory {
    http_client: reqwest::Client,
    url: String,
}

impl HttpHistory {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl HistorySource for HttpHistory {
    async fn fetch_dismissals(&self) -> Result<Vec<DismissedPlayer>, FetchError> {
        let response = self.http_client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

/// Fixed dismissal list, or a fixed failure.
pub struct StaticHistory {
    result: Result<Vec<DismissedPlayer>, u16>,
}

impl StaticHistory {
    pub fn new(players: Vec<DismissedPlayer>) -> Self {
        Self { result: Ok(players) }
    }

    /// Source that always fails with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
        }
    }
}

#[async_trait]
impl HistorySource for StaticHistory {
    async fn fetch_dismissals(&self) -> Result<Vec<DismissedPlayer>, FetchError> {
        self.result.clone().map_err(FetchError::Status)
    }
}

/// Seed `writer`'s state with fetched dismissals not already known.
/// Returns how many were added.
pub async fn bootstrap(writer: &StateWriter, source: &dyn HistorySource) -> usize {
    info!("[BOOT] Fetching historical dismissals");

    let fetched = match source.fetch_dismissals().await {
        Ok(players) => players,
        Err(e) => {
            warn!("[BOOT] Could not fetch dismissals, tracking from now on: {}", e);
            return 0;
        }
    };

    let current = writer.current().await;
    let mut next = (*current).clone();
    let mut added = 0;
    for player in fetched {
        if next.dismissed_players.iter().any(|p| p.name == player.name) {
            continue;
        }
        next.dismissed_players.push(player);
        added += 1;
    }

    if added == 0 {
        info!("[BOOT] No new historical dismissals");
        return 0;
    }

    writer.publish(next).await;
    info!("[BOOT] Seeded {} historical dismissals", added);
    added
}

//! Ingestion loop.
//!
//! Every candidate event, whatever its source, goes through one queue and is
//! validated and applied by a single task. Transitions therefore never race,
//! and a rejected candidate never reaches the state.

use std::sync::Arc;

use crease_common::config::EngineConfig;
use crease_common::{apply, validate, MatchState, RawEvent};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::state::StateWriter;

type Outcome = Result<Arc<MatchState>, IngestError>;

struct Submission {
    candidate: RawEvent,
    reply: Option<oneshot::Sender<Outcome>>,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Owner of the state writer. Run it on its own task.
pub struct Ingestor {
    writer: StateWriter,
    rx: mpsc::Receiver<Submission>,
    window: usize,
    stats: IngestStats,
}

/// Cloneable entry point into the queue.
#[derive(Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<Submission>,
}

/// Build the loop and its first handle. The loop takes the writer, so nothing
/// else can publish a state from here on.
pub fn ingest_channel(writer: StateWriter, engine: &EngineConfig) -> (Ingestor, IngestHandle) {
    let (tx, rx) = mpsc::channel(engine.queue_capacity.max(1));
    let ingestor = Ingestor {
        writer,
        rx,
        window: engine.recent_window.max(1),
        stats: IngestStats::default(),
    };
    (ingestor, IngestHandle { tx })
}

impl Ingestor {
    /// Process candidates in arrival order until every handle is dropped.
    pub async fn run(mut self) -> IngestStats {
        info!("[INGEST] Loop started (window {})", self.window);

        while let Some(Submission { candidate, reply }) = self.rx.recv().await {
            let outcome = self.process(&candidate).await;
            if let Some(reply) = reply {
                // Submitter may have given up waiting; the transition stands.
                let _ = reply.send(outcome);
            }
        }

        info!(
            "[INGEST] Loop stopped: {} accepted, {} rejected",
            self.stats.accepted, self.stats.rejected
        );
        self.stats
    }

    async fn process(&mut self, candidate: &RawEvent) -> Outcome {
        let current = self.writer.current().await;

        let event = match validate(candidate, &current) {
            Ok(event) => event,
            Err(e) => {
                self.stats.rejected += 1;
                warn!("[INGEST] Rejected ({}): {}", e.kind(), e);
                return Err(IngestError::Rejected(e));
            }
        };

        let next = apply(&current, &event, self.window);
        debug!(
            "[INGEST] p_draw {:.4} -> {:.4}",
            current.p_draw, next.p_draw
        );
        let published = self.writer.publish(next).await;
        self.stats.accepted += 1;
        info!(
            "[INGEST] {} | {} ({} ov)",
            event.describe(),
            published.score_line(),
            published.overs_played
        );
        Ok(published)
    }
}

impl IngestHandle {
    /// Queue a candidate and wait for its outcome.
    pub async fn submit(&self, candidate: RawEvent) -> Outcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Submission {
                candidate,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| IngestError::Closed)?;
        reply_rx.await.map_err(|_| IngestError::Closed)?
    }

    /// Queue a candidate without waiting for validation. Waits only while the
    /// queue is full.
    pub async fn enqueue(&self, candidate: RawEvent) -> Result<(), IngestError> {
        self.tx
            .send(Submission {
                candidate,
                reply: None,
            })
            .await
            .map_err(|_| IngestError::Closed)
    }
}

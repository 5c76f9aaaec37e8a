//! Match state handle.
//!
//! One `StateWriter` exists per match and it is not `Clone`, so only its owner
//! (the ingestion loop) can publish. Readers get an `Arc` snapshot that stays
//! valid and unchanged however many transitions happen after they took it.

use std::sync::Arc;

use crease_common::MatchState;
use tokio::sync::RwLock;

type Slot = Arc<RwLock<Arc<MatchState>>>;

/// Sole publisher of new states.
pub struct StateWriter {
    slot: Slot,
}

/// Cheap, cloneable read access to the latest published state.
#[derive(Clone)]
pub struct StateReader {
    slot: Slot,
}

/// Create the handle pair for a freshly initialised match.
pub fn create_shared_state(initial: MatchState) -> (StateWriter, StateReader) {
    let slot: Slot = Arc::new(RwLock::new(Arc::new(initial)));
    (
        StateWriter { slot: slot.clone() },
        StateReader { slot },
    )
}

impl StateWriter {
    pub async fn current(&self) -> Arc<MatchState> {
        self.slot.read().await.clone()
    }

    /// Replace the current state. The write lock covers only the pointer swap.
    pub async fn publish(&self, next: MatchState) -> Arc<MatchState> {
        let next = Arc::new(next);
        *self.slot.write().await = next.clone();
        next
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            slot: self.slot.clone(),
        }
    }
}

impl StateReader {
    pub async fn snapshot(&self) -> Arc<MatchState> {
        self.slot.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_common::MatchConfig;

    fn initial() -> MatchState {
        MatchConfig::default().initial_state().unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_survives_publish() {
        let (writer, reader) = create_shared_state(initial());
        let before = reader.snapshot().await;

        let mut next = (*before).clone();
        next.total_runs = 31;
        writer.publish(next).await;

        assert_eq!(before.total_runs, 27);
        assert_eq!(reader.snapshot().await.total_runs, 31);
        assert_eq!(writer.current().await.total_runs, 31);
    }

    #[tokio::test]
    async fn test_readers_share_slot() {
        let (writer, reader) = create_shared_state(initial());
        let other = writer.reader();
        let mut next = initial();
        next.wickets_lost = 3;
        writer.publish(next).await;
        assert_eq!(reader.snapshot().await.wickets_lost, 3);
        assert_eq!(other.snapshot().await.wickets_lost, 3);
    }
}

//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for day messages and the
//! latest day-consistent snapshot served by the snapshot endpoint. The
//! engine pushes after each committed day; observers only ever read.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use aicity_types::{CitySnapshot, ObserverMessage};

/// Capacity of the per-observer broadcast buffer.
///
/// A subscriber that falls behind by more than this many messages gets a
/// `Lagged` error, is dropped from the live feed, and must re-sync via
/// the snapshot endpoint. Slow observers never block the tick.
pub const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for day messages.
    tx: broadcast::Sender<ObserverMessage>,
    /// The latest committed snapshot (consistent with a day boundary).
    snapshot: Arc<RwLock<Option<CitySnapshot>>>,
}

impl AppState {
    /// Create fresh state with an empty snapshot.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribe to the live feed.
    pub fn subscribe(&self) -> broadcast::Receiver<ObserverMessage> {
        self.tx.subscribe()
    }

    /// Publish one day's messages in commit order and install the new
    /// snapshot.
    ///
    /// Send errors (no connected observers) are ignored: the simulation
    /// does not care whether anyone is watching.
    pub async fn publish_day(&self, messages: Vec<ObserverMessage>, snapshot: CitySnapshot) {
        {
            let mut guard = self.snapshot.write().await;
            *guard = Some(snapshot);
        }
        for message in messages {
            let _ = self.tx.send(message);
        }
    }

    /// The latest snapshot, if a day has committed.
    pub async fn snapshot(&self) -> Option<CitySnapshot> {
        self.snapshot.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_snapshot(day: u64) -> CitySnapshot {
        CitySnapshot {
            day,
            agents: Vec::new(),
            graveyard: Vec::new(),
            assets: Vec::new(),
            projects: Vec::new(),
            gangs: Vec::new(),
            lots: Vec::new(),
            tiles: Vec::new(),
            vault_balance: 0,
            circulating: 0,
            total_supply: 0,
        }
    }

    #[tokio::test]
    async fn publish_installs_snapshot_and_fans_out() {
        let state = AppState::new();
        let mut rx = state.subscribe();
        state
            .publish_day(
                vec![ObserverMessage::TimePhase {
                    day: 1,
                    phase: aicity_types::TimePhase::Morning,
                }],
                empty_snapshot(1),
            )
            .await;

        assert_eq!(state.snapshot().await.map(|s| s.day), Some(1));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.day(), 1);
    }

    #[tokio::test]
    async fn publishing_without_observers_is_fine() {
        let state = AppState::new();
        state
            .publish_day(
                vec![ObserverMessage::TimePhase {
                    day: 1,
                    phase: aicity_types::TimePhase::Morning,
                }],
                empty_snapshot(1),
            )
            .await;
        assert!(state.snapshot().await.is_some());
    }
}

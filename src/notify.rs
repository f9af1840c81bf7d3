//! In-process fan-out of game events.
//!
//! One invalidation mechanism: services publish an event after the owning
//! database transaction commits, and read-side consumers (pollers, push
//! transports, test harnesses) subscribe. Polling the round snapshot remains
//! available as a fallback heartbeat. Delivery beyond the process boundary
//! is out of scope here.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Events emitted by the game core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    RoundOpened { round_id: Uuid },
    RoundLive { round_id: Uuid },
    RoundEnding { round_id: Uuid },
    RoundSettled { round_id: Uuid, winner_count: usize },
    RoundCancelled { round_id: Uuid },
    ParticipantJoined { round_id: Uuid, user_id: Uuid, spectator: bool },
    ParticipantLeft { round_id: Uuid, user_id: Uuid },
    CommentPosted { round_id: Uuid, user_id: Uuid, seq: i64 },
}

/// Broadcast hub for [`GameEvent`]s.
pub struct GameNotifier {
    tx: broadcast::Sender<GameEvent>,
}

impl GameNotifier {
    pub fn new() -> Self {
        // Slow receivers lag rather than block publishers.
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Subscribe to all game events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Publishing with no subscribers is not an error.
    pub fn publish(&self, event: GameEvent) {
        debug!(?event, "publishing game event");
        let _ = self.tx.send(event);
    }
}

impl Default for GameNotifier {
    fn default() -> Self {
        Self::new()
    }
}

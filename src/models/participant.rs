use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A (round, user) membership row. Created by join, removed only by an
/// explicit leave before entry closes. Spectators never pay, comment or win;
/// switching roles requires leaving and rejoining while entry is open.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub round_id: Uuid,
    pub user_id: Uuid,
    pub is_spectator: bool,
    pub fee_paid: i64,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// A player is a non-spectator participant.
    pub fn is_player(&self) -> bool {
        !self.is_spectator
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Finalized settlement record for a round. Created exactly once (unique on
/// `round_id`), immutable thereafter. A round with zero commenters settles
/// with `winner_count = 0` and no winner rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettlementOutcome {
    pub id: Uuid,
    pub round_id: Uuid,
    pub pool_value: i64,
    pub distributable_pool: i64,
    pub winner_count: i64,
    pub settled_at: DateTime<Utc>,
}

/// One paid rank of a settlement. `position` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettlementWinner {
    pub outcome_id: Uuid,
    pub position: i64,
    pub user_id: Uuid,
    pub amount: i64,
}

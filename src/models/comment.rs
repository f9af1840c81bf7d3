use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One comment in a round's append-only stream.
///
/// `seq` is a per-round insertion counter and `posted_at_ms` a
/// server-assigned unix-millisecond timestamp; both are strictly increasing
/// within a round, which makes the derived commenter ranking deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub round_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub seq: i64,
    pub posted_at_ms: i64,
}

/// One entry of the derived ordered-commenter list: unique users by most
/// recent comment, descending. Rank 1 is the last commenter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankedCommenter {
    pub user_id: Uuid,
    pub last_seq: i64,
    pub last_posted_ms: i64,
}

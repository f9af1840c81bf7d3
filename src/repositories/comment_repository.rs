//! Repository for the append-only per-round comment stream.
//!
//! The insert statement assigns both ordering keys server-side in one
//! atomic statement: `seq` is the next per-round counter and
//! `posted_at_ms` is forced strictly greater than the round's previous
//! comment, so ordering never depends on client clocks and exact ties are
//! impossible by construction.

use crate::error::RepositoryError;
use crate::models::{Comment, RankedCommenter};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a comment, conditioned on the round being live. Returns
    /// `None` if the round was not live at insert time (the race with the
    /// round's end is decided here, atomically).
    pub async fn append(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Option<Comment>, RepositoryError> {
        let now_ms = Utc::now().timestamp_millis();

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (round_id, user_id, content, seq, posted_at_ms)
            SELECT
                ?1, ?2, ?3,
                COALESCE((SELECT MAX(seq) FROM comments WHERE round_id = ?1), 0) + 1,
                MAX(?4, COALESCE((SELECT MAX(posted_at_ms) FROM comments WHERE round_id = ?1), 0) + 1)
            WHERE EXISTS (SELECT 1 FROM rounds WHERE id = ?1 AND status = 'live')
            RETURNING id, round_id, user_id, content, seq, posted_at_ms
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .bind(content)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Full stream for a round in insertion order.
    pub async fn list_by_round(&self, round_id: Uuid) -> Result<Vec<Comment>, RepositoryError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, round_id, user_id, content, seq, posted_at_ms
            FROM comments
            WHERE round_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Millisecond timestamp of the round's most recent comment, if any.
    /// Drives the rolling countdown, which is computed on read rather than
    /// stored as a ticking value.
    pub async fn last_comment_ms(&self, round_id: Uuid) -> Result<Option<i64>, RepositoryError> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT MAX(posted_at_ms) FROM comments WHERE round_id = ?1")
                .bind(round_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(last)
    }

    /// Number of comments in the round.
    pub async fn count(&self, round_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE round_id = ?1")
            .bind(round_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// The derived ordered-commenter list: unique users by most recent
    /// comment, descending. Deterministic for a fixed comment set because
    /// `seq` is unique within a round. Rank 1 is the first entry.
    pub async fn ranked_commenters(
        &self,
        round_id: Uuid,
    ) -> Result<Vec<RankedCommenter>, RepositoryError> {
        let ranked = sqlx::query_as::<_, RankedCommenter>(
            r#"
            SELECT user_id, MAX(seq) AS last_seq, MAX(posted_at_ms) AS last_posted_ms
            FROM comments
            WHERE round_id = ?1
            GROUP BY user_id
            ORDER BY last_seq DESC
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ranked)
    }
}

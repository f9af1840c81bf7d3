//! Repository for finalized settlement outcomes.

use crate::error::RepositoryError;
use crate::models::{SettlementOutcome, SettlementWinner};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct OutcomeRepository {
    pool: SqlitePool,
}

impl OutcomeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record the outcome for a round, exactly once. A retry after a
    /// partial settlement failure finds the existing record (unique on
    /// `round_id`) and returns it unchanged.
    pub async fn record(
        &self,
        round_id: Uuid,
        pool_value: i64,
        distributable_pool: i64,
        winners: &[(i64, Uuid, i64)], // (position, user_id, amount)
    ) -> Result<SettlementOutcome, RepositoryError> {
        let now = Utc::now();
        let outcome_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO settlement_outcomes
                (id, round_id, pool_value, distributable_pool, winner_count, settled_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(outcome_id)
        .bind(round_id)
        .bind(pool_value)
        .bind(distributable_pool)
        .bind(winners.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return self
                .find_by_round(round_id)
                .await?
                .ok_or_else(|| RepositoryError::NotFound("Settlement outcome".to_string()));
        }

        for (position, user_id, amount) in winners {
            sqlx::query(
                r#"
                INSERT INTO settlement_winners (outcome_id, position, user_id, amount)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(outcome_id)
            .bind(*position)
            .bind(*user_id)
            .bind(*amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_round(round_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Settlement outcome".to_string()))
    }

    /// Find the outcome for a round.
    pub async fn find_by_round(
        &self,
        round_id: Uuid,
    ) -> Result<Option<SettlementOutcome>, RepositoryError> {
        let outcome = sqlx::query_as::<_, SettlementOutcome>(
            r#"
            SELECT id, round_id, pool_value, distributable_pool, winner_count, settled_at
            FROM settlement_outcomes
            WHERE round_id = ?1
            "#,
        )
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// Winners of a settled round in rank order.
    pub async fn winners(
        &self,
        outcome_id: Uuid,
    ) -> Result<Vec<SettlementWinner>, RepositoryError> {
        let winners = sqlx::query_as::<_, SettlementWinner>(
            r#"
            SELECT outcome_id, position, user_id, amount
            FROM settlement_winners
            WHERE outcome_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(outcome_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(winners)
    }
}

//! Repository for the participation registry.
//!
//! Join and leave are single atomic units of work: the participant row, the
//! wallet movement, its ledger entry and the denormalized
//! `participant_count` all commit or roll back together. The conditional
//! participant insert/delete doubles as the race gate, so two concurrent
//! joins from the same user produce exactly one row and one debit.

use crate::error::RepositoryError;
use crate::models::Participant;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Result of an atomic join attempt.
#[derive(Debug)]
pub enum JoinRow {
    /// This call inserted the row (and debited the fee, if any).
    Inserted(Participant),
    /// The (round, user) pair already existed; nothing was charged.
    AlreadyJoined(Participant),
    /// The round no longer accepts entry.
    RoundClosed,
    /// Fee debit failed; the whole join rolled back.
    InsufficientFunds,
}

/// Result of an atomic leave attempt.
#[derive(Debug)]
pub enum LeaveRow {
    /// Row removed; the refunded amount (0 for spectators/free rounds).
    Removed { refunded: i64 },
    /// No row and the round would still have allowed leaving.
    NotParticipant,
    /// The round is live or later; the row (if any) is untouched.
    TooLate,
}

pub struct ParticipantRepository {
    pool: SqlitePool,
}

impl ParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically join a round, debiting `fee` for players on paid rounds.
    ///
    /// The insert is conditioned on the round still accepting entry, so a
    /// join racing the open→live transition cannot slip in after live
    /// start; the duplicate-key ignore makes concurrent duplicate joins
    /// idempotent.
    pub async fn join(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        as_spectator: bool,
        fee: i64,
    ) -> Result<JoinRow, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO participants
                (round_id, user_id, is_spectator, fee_paid, joined_at)
            SELECT ?1, ?2, ?3, ?4, ?5
            WHERE EXISTS (
                SELECT 1 FROM rounds
                WHERE id = ?1
                  AND status IN ('scheduled', 'open')
                  AND live_start_at > ?5
            )
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .bind(as_spectator)
        .bind(fee)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // Either the pair already exists (idempotent success) or the
            // entry gate failed.
            let existing = self.fetch(&mut tx, round_id, user_id).await?;
            tx.rollback().await?;
            return Ok(match existing {
                Some(p) => JoinRow::AlreadyJoined(p),
                None => JoinRow::RoundClosed,
            });
        }

        if fee > 0 {
            let debited = sqlx::query(
                r#"
                UPDATE wallets
                SET balance = balance - ?2, updated_at = ?3
                WHERE user_id = ?1 AND balance >= ?2
                "#,
            )
            .bind(user_id)
            .bind(fee)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if debited == 0 {
                tx.rollback().await?;
                return Ok(JoinRow::InsufficientFunds);
            }

            sqlx::query(
                r#"
                INSERT INTO wallet_transactions
                    (id, user_id, round_id, kind, amount, description, status, created_at)
                VALUES (?1, ?2, ?3, 'entry_debit', ?4, 'Entry fee', 'confirmed', ?5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(round_id)
            .bind(-fee)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE rounds SET participant_count = participant_count + 1 WHERE id = ?1")
            .bind(round_id)
            .execute(&mut *tx)
            .await?;

        let participant = self
            .fetch(&mut tx, round_id, user_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Participant vanished mid-join".to_string()))?;

        tx.commit().await?;

        Ok(JoinRow::Inserted(participant))
    }

    /// Atomically leave a round before it goes live, refunding any paid fee.
    ///
    /// The delete is conditioned on the round still accepting entry; once
    /// live (or later) the row stays and no refund is issued.
    pub async fn leave(&self, round_id: Uuid, user_id: Uuid) -> Result<LeaveRow, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let removed: Option<(i64,)> = sqlx::query_as(
            r#"
            DELETE FROM participants
            WHERE round_id = ?1 AND user_id = ?2
              AND EXISTS (
                  SELECT 1 FROM rounds
                  WHERE id = ?1 AND status IN ('scheduled', 'open')
              )
            RETURNING fee_paid
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let fee_paid = match removed {
            Some((fee,)) => fee,
            None => {
                let existed = self.fetch(&mut tx, round_id, user_id).await?.is_some();
                tx.rollback().await?;
                return Ok(if existed {
                    LeaveRow::TooLate
                } else {
                    LeaveRow::NotParticipant
                });
            }
        };

        if fee_paid > 0 {
            sqlx::query(
                r#"
                INSERT INTO wallet_transactions
                    (id, user_id, round_id, kind, amount, description, status, created_at)
                VALUES (?1, ?2, ?3, 'entry_refund', ?4, 'Left round - entry refunded', 'confirmed', ?5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(round_id)
            .bind(fee_paid)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO wallets (user_id, balance, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (user_id) DO UPDATE
                SET balance = balance + excluded.balance, updated_at = excluded.updated_at
                "#,
            )
            .bind(user_id)
            .bind(fee_paid)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE rounds SET participant_count = participant_count - 1 WHERE id = ?1")
            .bind(round_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(LeaveRow::Removed { refunded: fee_paid })
    }

    /// Find a participant row.
    pub async fn find(
        &self,
        round_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>, RepositoryError> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT round_id, user_id, is_spectator, fee_paid, joined_at
            FROM participants
            WHERE round_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    /// Number of non-spectator participants. The live-start minimum counts
    /// these, not spectators.
    pub async fn player_count(&self, round_id: Uuid) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM participants WHERE round_id = ?1 AND is_spectator = FALSE",
        )
        .bind(round_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Sum of entry fees actually collected for the round. This is the
    /// round's pool value before sponsorship.
    pub async fn total_fees(&self, round_id: Uuid) -> Result<i64, RepositoryError> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT CAST(TOTAL(fee_paid) AS INTEGER) FROM participants WHERE round_id = ?1",
        )
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    async fn fetch(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        round_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>, RepositoryError> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT round_id, user_id, is_spectator, fee_paid, joined_at
            FROM participants
            WHERE round_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(round_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(participant)
    }
}

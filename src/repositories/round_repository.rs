//! Repository for round data access and status transitions.
//!
//! Every lifecycle transition is a conditional update keyed on the round's
//! current status ("set status to X only where status is still Y"). Zero
//! rows affected means another invocation already performed the transition;
//! callers treat that as a no-op, which is what makes overlapping ticks,
//! retries and manual force-transitions race-free.

use crate::error::RepositoryError;
use crate::models::{PayoutType, Round, RoundStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Parameters for creating a round. Validated by the round service before
/// reaching the repository.
#[derive(Debug, Clone)]
pub struct NewRound {
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub entry_open_at: DateTime<Utc>,
    pub live_start_at: DateTime<Utc>,
    pub comment_timer_seconds: i64,
    pub max_duration_minutes: i64,
    pub entry_fee: i64,
    pub is_sponsored: bool,
    pub sponsored_amount: i64,
    pub payout_type: PayoutType,
    pub payout_distribution: Vec<Decimal>,
    pub platform_cut: Decimal,
    pub min_participants: i64,
}

const ROUND_COLUMNS: &str = "id, status, title, scheduled_at, entry_open_at, live_start_at, \
     started_at, live_end_at, comment_timer_seconds, max_duration_minutes, entry_fee, \
     is_sponsored, sponsored_amount, payout_type, payout_distribution, platform_cut, \
     participant_count, min_participants, status_changed_at, created_at";

pub struct RoundRepository {
    pool: SqlitePool,
}

impl RoundRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new round in `scheduled` status.
    pub async fn create(&self, new: &NewRound) -> Result<Round, RepositoryError> {
        let distribution: Vec<String> = new
            .payout_distribution
            .iter()
            .map(|d| d.to_string())
            .collect();
        let distribution_json = serde_json::to_string(&distribution)
            .map_err(|e| RepositoryError::InvalidInput(e.to_string()))?;

        let now = Utc::now();
        let round = sqlx::query_as::<_, Round>(&format!(
            r#"
            INSERT INTO rounds
                (id, status, title, scheduled_at, entry_open_at, live_start_at,
                 comment_timer_seconds, max_duration_minutes, entry_fee,
                 is_sponsored, sponsored_amount, payout_type, payout_distribution,
                 platform_cut, participant_count, min_participants,
                 status_changed_at, created_at)
            VALUES (?1, 'scheduled', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 0, ?14, ?15, ?15)
            RETURNING {ROUND_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(new.scheduled_at)
        .bind(new.entry_open_at)
        .bind(new.live_start_at)
        .bind(new.comment_timer_seconds)
        .bind(new.max_duration_minutes)
        .bind(new.entry_fee)
        .bind(new.is_sponsored)
        .bind(new.sponsored_amount)
        .bind(new.payout_type.as_str())
        .bind(distribution_json)
        .bind(new.platform_cut.to_string())
        .bind(new.min_participants)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(round)
    }

    /// Find a round by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Round>, RepositoryError> {
        let round = sqlx::query_as::<_, Round>(&format!(
            "SELECT {ROUND_COLUMNS} FROM rounds WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(round)
    }

    /// All rounds in non-terminal status, oldest first. The ticker's work
    /// list.
    pub async fn list_active(&self) -> Result<Vec<Round>, RepositoryError> {
        let rounds = sqlx::query_as::<_, Round>(&format!(
            r#"
            SELECT {ROUND_COLUMNS} FROM rounds
            WHERE status NOT IN ('settled', 'cancelled')
            ORDER BY created_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rounds)
    }

    /// Conditional status transition. Returns `true` if this call performed
    /// the transition, `false` on a lost race (someone else already did).
    pub async fn transition(
        &self,
        id: Uuid,
        from: RoundStatus,
        to: RoundStatus,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE rounds
            SET status = ?3, status_changed_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    /// `open → live`, recording the actual start and deriving the hard
    /// duration cap from it.
    pub async fn go_live(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let round = match self.find_by_id(id).await? {
            Some(r) => r,
            None => return Ok(false),
        };
        let live_end_at = now + round.max_duration();

        let updated = sqlx::query(
            r#"
            UPDATE rounds
            SET status = 'live', started_at = ?2, live_end_at = ?3, status_changed_at = ?2
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(live_end_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    /// `open → cancelled` with every paid participant refunded in the same
    /// database transaction: state and money flip together, so a poller can
    /// never observe a cancelled round with funds still missing.
    ///
    /// Returns `true` if this call performed the cancellation.
    pub async fn cancel_with_refunds(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query(
            r#"
            UPDATE rounds
            SET status = 'cancelled', status_changed_at = ?2
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if cancelled == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let paid: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT user_id, fee_paid FROM participants WHERE round_id = ?1 AND fee_paid > 0",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // The status flip above is the exactly-once gate for these refunds:
        // a lost race rolls the whole transaction back before reaching here.
        for (user_id, fee) in paid {
            sqlx::query(
                r#"
                INSERT INTO wallet_transactions
                    (id, user_id, round_id, kind, amount, description, status, created_at)
                VALUES (?1, ?2, ?3, 'entry_refund', ?4, 'Round cancelled - entry refunded', 'confirmed', ?5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(id)
            .bind(fee)
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
            .bind(fee)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }
}

//! Repository for wallet balances and the append-only transaction ledger.
//!
//! Every balance mutation pairs a ledger insert with a relative update of
//! the cached balance inside one database transaction. Debits are
//! conditional on sufficient funds (never read-modify-write as two steps).
//! Prize payouts are idempotent via the unique partial index on
//! (round_id, user_id) for the payout kind: a retried payout inserts zero
//! rows and credits nothing.

use crate::error::RepositoryError;
use crate::models::{TransactionKind, Wallet, WalletTransaction};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct WalletRepository {
    pool: SqlitePool,
}

impl WalletRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get or create a user's wallet.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, RepositoryError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, balance, updated_at)
            VALUES (?1, 0, ?2)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at
            RETURNING user_id, balance, updated_at
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Cached balance; zero for a user with no wallet row.
    pub async fn balance(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance.unwrap_or(0))
    }

    /// Balance re-derived by summing the ledger. Must always equal the
    /// cached balance; exposed for reconciliation checks.
    pub async fn reconciled_balance(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT CAST(TOTAL(amount) AS INTEGER) FROM wallet_transactions WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    /// Credit funds to a user's wallet (deposits, external top-ups).
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        round_id: Option<Uuid>,
        description: Option<&str>,
    ) -> Result<Wallet, RepositoryError> {
        if amount <= 0 {
            return Err(RepositoryError::InvalidInput(
                "Credit amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, balance, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE
            SET balance = balance + excluded.balance, updated_at = excluded.updated_at
            RETURNING user_id, balance, updated_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions
                (id, user_id, round_id, kind, amount, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'confirmed', ?7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(round_id)
        .bind(kind.as_str())
        .bind(amount)
        .bind(description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(wallet)
    }

    /// Debit funds from a user's wallet. The decrement is conditional on
    /// sufficient balance; a concurrent debit can never overdraw.
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        round_id: Option<Uuid>,
        description: Option<&str>,
    ) -> Result<Wallet, RepositoryError> {
        if amount <= 0 {
            return Err(RepositoryError::InvalidInput(
                "Debit amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - ?2, updated_at = ?3
            WHERE user_id = ?1 AND balance >= ?2
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            return Err(RepositoryError::BusinessRule(format!(
                "Insufficient balance for debit of {}",
                amount
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions
                (id, user_id, round_id, kind, amount, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'confirmed', ?7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(round_id)
        .bind(kind.as_str())
        .bind(-amount)
        .bind(description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(wallet)
    }

    /// Issue a prize payout for a round, exactly once per (round, user).
    ///
    /// Returns `true` if the payout was issued by this call, `false` if an
    /// earlier attempt already paid this winner (retry after partial
    /// settlement failure).
    pub async fn pay_prize(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<bool, RepositoryError> {
        if amount <= 0 {
            return Err(RepositoryError::InvalidInput(
                "Payout amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // The unique payout index on (round_id, user_id) is the idempotency
        // gate: zero rows inserted means this winner was already paid.
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO wallet_transactions
                (id, user_id, round_id, kind, amount, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'confirmed', ?7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(round_id)
        .bind(TransactionKind::PrizePayout.as_str())
        .bind(amount)
        .bind(description)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id) DO UPDATE
            SET balance = balance + excluded.balance, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    /// Transaction history for a user, newest first.
    pub async fn transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, round_id, kind, amount, description, status, created_at
            FROM wallet_transactions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// All ledger rows for a round, oldest first.
    pub async fn round_transactions(
        &self,
        round_id: Uuid,
    ) -> Result<Vec<WalletTransaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, round_id, kind, amount, description, status, created_at
            FROM wallet_transactions
            WHERE round_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(round_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

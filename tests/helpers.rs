use chrono::{DateTime, Duration, Utc};
use fastfinger_backend::config::GameConfig;
use fastfinger_backend::models::*;
use fastfinger_backend::services::{CreateRound, PayoutPlan};
use fastfinger_backend::AppState;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Fully wired application over a per-test database.
pub struct TestApp {
    pub pool: SqlitePool,
    pub state: Arc<AppState>,
}

impl TestApp {
    /// Wire the application from an existing pool (for use with sqlx::test,
    /// which provisions the database and applies migrations).
    pub async fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool: pool.clone(),
            state: Arc::new(AppState::new(pool, GameConfig::default())),
        }
    }
}

/// Create a user with a funded wallet.
pub async fn funded_user(app: &TestApp, amount: i64) -> Uuid {
    let user_id = Uuid::new_v4();
    app.state
        .wallet_repo
        .credit(
            user_id,
            amount,
            TransactionKind::Deposit,
            None,
            Some("Test deposit"),
        )
        .await
        .expect("Failed to fund test user");
    user_id
}

/// Round parameters with entry already open and live start comfortably in
/// the future, so joins succeed immediately and nothing transitions until
/// a test forces it.
pub fn round_spec(entry_fee: i64, min_participants: i64, plan: PayoutPlan) -> CreateRound {
    let now = Utc::now();
    CreateRound {
        title: "Test round".to_string(),
        scheduled_at: now,
        entry_open_at: now - Duration::seconds(60),
        live_start_at: now + Duration::minutes(10),
        comment_timer_seconds: 30,
        max_duration_minutes: 10,
        entry_fee,
        is_sponsored: false,
        sponsored_amount: 0,
        min_participants,
        plan,
    }
}

/// Create a round from a spec.
pub async fn create_round(app: &TestApp, spec: CreateRound) -> Round {
    app.state
        .rounds
        .create(spec)
        .await
        .expect("Failed to create test round")
}

/// Current status of a round.
pub async fn round_status(app: &TestApp, round_id: Uuid) -> RoundStatus {
    app.state
        .round_repo
        .find_by_id(round_id)
        .await
        .expect("Failed to load round")
        .expect("Round missing")
        .status_enum()
}

/// Run one transition check for a round.
pub async fn tick(app: &TestApp, round_id: Uuid) {
    app.state
        .game_cycle
        .tick(round_id)
        .await
        .expect("Tick failed");
}

/// Move a round's live start time (to drive transitions without sleeping).
pub async fn set_live_start(app: &TestApp, round_id: Uuid, at: DateTime<Utc>) {
    sqlx::query("UPDATE rounds SET live_start_at = ?2 WHERE id = ?1")
        .bind(round_id)
        .bind(at)
        .execute(&app.pool)
        .await
        .expect("Failed to set live_start_at");
}

/// Move a live round's hard duration cap.
pub async fn set_live_end(app: &TestApp, round_id: Uuid, at: DateTime<Utc>) {
    sqlx::query("UPDATE rounds SET live_end_at = ?2 WHERE id = ?1")
        .bind(round_id)
        .bind(at)
        .execute(&app.pool)
        .await
        .expect("Failed to set live_end_at");
}

/// Force a round into a status directly, with a given claim timestamp.
pub async fn force_status(
    app: &TestApp,
    round_id: Uuid,
    status: RoundStatus,
    changed_at: DateTime<Utc>,
) {
    sqlx::query("UPDATE rounds SET status = ?2, status_changed_at = ?3 WHERE id = ?1")
        .bind(round_id)
        .bind(status.as_str())
        .bind(changed_at)
        .execute(&app.pool)
        .await
        .expect("Failed to force round status");
}

/// Shift every comment in a round into the past, as if time had elapsed
/// since it was posted.
pub async fn backdate_comments(app: &TestApp, round_id: Uuid, by_millis: i64) {
    sqlx::query("UPDATE comments SET posted_at_ms = posted_at_ms - ?2 WHERE round_id = ?1")
        .bind(round_id)
        .bind(by_millis)
        .execute(&app.pool)
        .await
        .expect("Failed to backdate comments");
}

/// Drive a round from `scheduled` all the way to `live`. Joins must have
/// happened already; this moves live start into the past and ticks twice.
pub async fn drive_live(app: &TestApp, round_id: Uuid) {
    set_live_start(app, round_id, Utc::now() - Duration::seconds(1)).await;
    tick(app, round_id).await; // scheduled -> open
    tick(app, round_id).await; // open -> live (or cancelled)
}

/// Assert the cached wallet balance matches the sum of the ledger.
pub async fn assert_reconciled(app: &TestApp, user_id: Uuid) {
    let cached = app
        .state
        .wallet_repo
        .balance(user_id)
        .await
        .expect("Failed to read balance");
    let ledger = app
        .state
        .wallet_repo
        .reconciled_balance(user_id)
        .await
        .expect("Failed to reconcile balance");
    assert_eq!(
        cached, ledger,
        "cached balance diverged from ledger for {}",
        user_id
    );
}

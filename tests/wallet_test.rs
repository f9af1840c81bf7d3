mod helpers;

use fastfinger_backend::error::RepositoryError;
use fastfinger_backend::models::*;
use fastfinger_backend::services::PayoutPlan;
use helpers::*;
use sqlx::SqlitePool;
use uuid::Uuid;

#[sqlx::test]
async fn test_get_or_create_starts_at_zero(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = Uuid::new_v4();

    let wallet = app.state.wallet_repo.get_or_create(user).await.unwrap();
    assert_eq!(wallet.balance, 0);

    // Idempotent.
    let again = app.state.wallet_repo.get_or_create(user).await.unwrap();
    assert_eq!(again.balance, 0);
}

#[sqlx::test]
async fn test_credit_writes_ledger_and_cache_together(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = Uuid::new_v4();

    let wallet = app
        .state
        .wallet_repo
        .credit(user, 500, TransactionKind::Deposit, None, Some("Top-up"))
        .await
        .unwrap();
    assert_eq!(wallet.balance, 500);
    assert_reconciled(&app, user).await;

    let history = app.state.wallet_repo.transactions(user, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 500);
    assert_eq!(history[0].kind, TransactionKind::Deposit.as_str());
}

#[sqlx::test]
async fn test_credit_rejects_non_positive_amount(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = Uuid::new_v4();

    let err = app
        .state
        .wallet_repo
        .credit(user, 0, TransactionKind::Deposit, None, None)
        .await
        .expect_err("Zero credit must fail");
    assert!(matches!(err, RepositoryError::InvalidInput(_)));
}

#[sqlx::test]
async fn test_debit_records_negative_ledger_entry(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = funded_user(&app, 1000).await;

    let wallet = app
        .state
        .wallet_repo
        .debit(user, 400, TransactionKind::Withdrawal, None, None)
        .await
        .unwrap();
    assert_eq!(wallet.balance, 600);
    assert_reconciled(&app, user).await;

    let history = app.state.wallet_repo.transactions(user, 10).await.unwrap();
    let withdrawal = history
        .iter()
        .find(|t| t.kind == TransactionKind::Withdrawal.as_str())
        .expect("Withdrawal entry missing");
    assert_eq!(withdrawal.amount, -400);
}

#[sqlx::test]
async fn test_debit_never_overdraws(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = funded_user(&app, 100).await;

    let err = app
        .state
        .wallet_repo
        .debit(user, 400, TransactionKind::Withdrawal, None, None)
        .await
        .expect_err("Overdraw must fail");
    assert!(matches!(err, RepositoryError::BusinessRule(_)));

    // Balance and ledger untouched.
    assert_eq!(app.state.wallet_repo.balance(user).await.unwrap(), 100);
    assert_reconciled(&app, user).await;
    let history = app.state.wallet_repo.transactions(user, 10).await.unwrap();
    assert_eq!(history.len(), 1); // only the deposit
}

#[sqlx::test]
async fn test_pay_prize_is_idempotent_per_round(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = Uuid::new_v4();
    let round = create_round(
        &app,
        round_spec(100, 1, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;

    let first = app
        .state
        .wallet_repo
        .pay_prize(round.id, user, 900, "Prize payout - rank 1")
        .await
        .unwrap();
    assert!(first);

    let second = app
        .state
        .wallet_repo
        .pay_prize(round.id, user, 900, "Prize payout - rank 1")
        .await
        .unwrap();
    assert!(!second, "retry must not pay twice");

    assert_eq!(app.state.wallet_repo.balance(user).await.unwrap(), 900);
    assert_reconciled(&app, user).await;
}

#[sqlx::test]
async fn test_balance_of_unknown_user_is_zero(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = Uuid::new_v4();

    assert_eq!(app.state.wallet_repo.balance(user).await.unwrap(), 0);
    assert_eq!(
        app.state.wallet_repo.reconciled_balance(user).await.unwrap(),
        0
    );
}

#[sqlx::test]
async fn test_ledger_reconciles_across_mixed_operations(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = funded_user(&app, 5000).await;
    let round = create_round(
        &app,
        round_spec(1200, 1, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;

    app.state
        .participation
        .join(round.id, user, false)
        .await
        .unwrap();
    app.state.participation.leave(round.id, user).await.unwrap();
    app.state
        .participation
        .join(round.id, user, false)
        .await
        .unwrap();
    app.state
        .wallet_repo
        .debit(user, 500, TransactionKind::Withdrawal, None, None)
        .await
        .unwrap();

    // 5000 - 1200 + 1200 - 1200 - 500
    assert_eq!(app.state.wallet_repo.balance(user).await.unwrap(), 3300);
    assert_reconciled(&app, user).await;
}

#[sqlx::test]
async fn test_round_transactions_collects_all_round_money(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let a = funded_user(&app, 2000).await;
    let b = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(800, 1, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;

    app.state
        .participation
        .join(round.id, a, false)
        .await
        .unwrap();
    app.state
        .participation
        .join(round.id, b, false)
        .await
        .unwrap();
    app.state.participation.leave(round.id, b).await.unwrap();

    let ledger = app
        .state
        .wallet_repo
        .round_transactions(round.id)
        .await
        .unwrap();
    let debits = ledger
        .iter()
        .filter(|t| t.kind == TransactionKind::EntryDebit.as_str())
        .count();
    let refunds = ledger
        .iter()
        .filter(|t| t.kind == TransactionKind::EntryRefund.as_str())
        .count();
    assert_eq!(debits, 2);
    assert_eq!(refunds, 1);
    // Escrowed money for the round is one fee.
    let held: i64 = ledger.iter().map(|t| t.amount).sum();
    assert_eq!(held, -800);
}

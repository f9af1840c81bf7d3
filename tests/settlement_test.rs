mod helpers;

use chrono::{Duration, Utc};
use fastfinger_backend::models::*;
use fastfinger_backend::services::{PayoutPlan, SettleAttempt};
use helpers::*;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn join_and_go_live(app: &TestApp, round_id: Uuid, users: &[Uuid]) {
    for user in users {
        app.state
            .participation
            .join(round_id, *user, false)
            .await
            .expect("Join failed");
    }
    drive_live(app, round_id).await;
    assert_eq!(round_status(app, round_id).await, RoundStatus::Live);
}

async fn end_and_settle(app: &TestApp, round_id: Uuid) {
    set_live_end(app, round_id, Utc::now() - Duration::seconds(1)).await;
    tick(app, round_id).await;
    assert_eq!(round_status(app, round_id).await, RoundStatus::Settled);
}

#[sqlx::test]
async fn test_top3_prize_split(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let mut users = Vec::new();
    for _ in 0..5 {
        users.push(funded_user(&app, 5000).await);
    }
    let round = create_round(
        &app,
        round_spec(2000, 2, PayoutPlan::standard(PayoutType::Top3)),
    )
    .await;
    join_and_go_live(&app, round.id, &users).await;

    // One comment each, in order: the most recent commenters win.
    for (i, user) in users.iter().enumerate() {
        app.state
            .comments
            .post(round.id, *user, &format!("comment {}", i))
            .await
            .expect("Post failed");
    }

    end_and_settle(&app, round.id).await;

    // Pool 10000, platform keeps 10%, 9000 split 50/30/20.
    let (outcome, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .expect("Outcome must exist");
    assert_eq!(outcome.pool_value, 10_000);
    assert_eq!(outcome.distributable_pool, 9_000);
    assert_eq!(outcome.winner_count, 3);

    assert_eq!(winners.len(), 3);
    assert_eq!(winners[0].position, 1);
    assert_eq!(winners[0].user_id, users[4]);
    assert_eq!(winners[0].amount, 4_500);
    assert_eq!(winners[1].user_id, users[3]);
    assert_eq!(winners[1].amount, 2_700);
    assert_eq!(winners[2].user_id, users[2]);
    assert_eq!(winners[2].amount, 1_800);

    // Balances: 5000 funded, 2000 entry, prize if won.
    assert_eq!(app.state.wallet_repo.balance(users[4]).await.unwrap(), 7_500);
    assert_eq!(app.state.wallet_repo.balance(users[3]).await.unwrap(), 5_700);
    assert_eq!(app.state.wallet_repo.balance(users[2]).await.unwrap(), 4_800);
    assert_eq!(app.state.wallet_repo.balance(users[1]).await.unwrap(), 3_000);
    assert_eq!(app.state.wallet_repo.balance(users[0]).await.unwrap(), 3_000);
    for user in &users {
        assert_reconciled(&app, *user).await;
    }
}

#[sqlx::test]
async fn test_most_recent_distinct_commenter_wins(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let a = funded_user(&app, 2000).await;
    let b = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 2, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;
    join_and_go_live(&app, round.id, &[a, b]).await;

    // a, then b, then a again: a's latest comment outranks b's.
    app.state.comments.post(round.id, a, "one").await.unwrap();
    app.state.comments.post(round.id, b, "two").await.unwrap();
    app.state.comments.post(round.id, a, "three").await.unwrap();

    end_and_settle(&app, round.id).await;

    let (outcome, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.winner_count, 1);
    assert_eq!(winners[0].user_id, a);
    // Pool 2000, distributable 1800, all to the single winner.
    assert_eq!(winners[0].amount, 1_800);
    assert_eq!(app.state.wallet_repo.balance(a).await.unwrap(), 2_800);
    assert_eq!(app.state.wallet_repo.balance(b).await.unwrap(), 1_000);
}

#[sqlx::test]
async fn test_fewer_commenters_than_prize_slots(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let talker = funded_user(&app, 2000).await;
    let quiet1 = funded_user(&app, 2000).await;
    let quiet2 = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 2, PayoutPlan::standard(PayoutType::Top3)),
    )
    .await;
    join_and_go_live(&app, round.id, &[talker, quiet1, quiet2]).await;

    app.state
        .comments
        .post(round.id, talker, "only me")
        .await
        .unwrap();

    end_and_settle(&app, round.id).await;

    // Pool 3000, distributable 2700; only rank 1 exists, paid its 50%
    // share. The unclaimed slots stay with the platform.
    let (outcome, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.winner_count, 1);
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].user_id, talker);
    assert_eq!(winners[0].amount, 1_350);
    assert_eq!(app.state.wallet_repo.balance(talker).await.unwrap(), 2_350);
    assert_eq!(app.state.wallet_repo.balance(quiet1).await.unwrap(), 1_000);
}

#[sqlx::test]
async fn test_zero_comment_round_pays_nobody(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let a = funded_user(&app, 2000).await;
    let b = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 2, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;
    join_and_go_live(&app, round.id, &[a, b]).await;

    end_and_settle(&app, round.id).await;

    let (outcome, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.winner_count, 0);
    assert!(winners.is_empty());
    assert_eq!(app.state.wallet_repo.balance(a).await.unwrap(), 1_000);
    assert_eq!(app.state.wallet_repo.balance(b).await.unwrap(), 1_000);
}

#[sqlx::test]
async fn test_sponsored_round_pays_from_sponsorship(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let a = funded_user(&app, 100).await;
    let b = funded_user(&app, 100).await;
    let mut spec = round_spec(0, 2, PayoutPlan::standard(PayoutType::WinnerTakesAll));
    spec.is_sponsored = true;
    spec.sponsored_amount = 5_000;
    let round = create_round(&app, spec).await;
    join_and_go_live(&app, round.id, &[a, b]).await;

    app.state.comments.post(round.id, a, "gg").await.unwrap();
    app.state.comments.post(round.id, b, "last").await.unwrap();

    end_and_settle(&app, round.id).await;

    // No entry fees; the sponsorship funds the pool. 5000 less the 10% cut.
    let (outcome, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.pool_value, 5_000);
    assert_eq!(outcome.distributable_pool, 4_500);
    assert_eq!(winners[0].user_id, b);
    assert_eq!(winners[0].amount, 4_500);
    assert_eq!(app.state.wallet_repo.balance(b).await.unwrap(), 4_600);
    assert_eq!(app.state.wallet_repo.balance(a).await.unwrap(), 100);
}

#[sqlx::test]
async fn test_spectators_never_win(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let player = funded_user(&app, 2000).await;
    let other = funded_user(&app, 2000).await;
    let watcher = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 2, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;
    app.state
        .participation
        .join(round.id, player, false)
        .await
        .unwrap();
    app.state
        .participation
        .join(round.id, other, false)
        .await
        .unwrap();
    app.state
        .participation
        .join(round.id, watcher, true)
        .await
        .unwrap();
    drive_live(&app, round.id).await;

    app.state
        .comments
        .post(round.id, player, "winning")
        .await
        .unwrap();
    // Spectators cannot post, so they can never rank.
    assert!(app
        .state
        .comments
        .post(round.id, watcher, "me too")
        .await
        .is_err());

    end_and_settle(&app, round.id).await;

    let (_, winners) = app
        .state
        .rounds
        .outcome(round.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].user_id, player);
    assert_eq!(app.state.wallet_repo.balance(watcher).await.unwrap(), 2_000);
}

#[sqlx::test]
async fn test_concurrent_settles_pay_once(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let a = funded_user(&app, 2000).await;
    let b = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 2, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;
    join_and_go_live(&app, round.id, &[a, b]).await;
    app.state.comments.post(round.id, a, "mine").await.unwrap();
    force_status(&app, round.id, RoundStatus::Ending, Utc::now()).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let state = app.state.clone();
        let round_id = round.id;
        handles.push(tokio::spawn(async move {
            let round = state
                .round_repo
                .find_by_id(round_id)
                .await
                .unwrap()
                .unwrap();
            state.settlement.settle(&round).await
        }));
    }

    let mut settled = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("Settle task panicked") {
            Ok(SettleAttempt::Settled) => settled += 1,
            Ok(SettleAttempt::Raced) => {}
            Err(e) => panic!("settle failed: {}", e),
        }
    }

    assert_eq!(settled, 1, "exactly one invocation settles");
    assert_eq!(round_status(&app, round.id).await, RoundStatus::Settled);
    // 2000 pool, 1800 distributable, paid exactly once.
    assert_eq!(app.state.wallet_repo.balance(a).await.unwrap(), 2_800);
    assert_reconciled(&app, a).await;

    let payouts: Vec<WalletTransaction> = app
        .state
        .wallet_repo
        .round_transactions(round.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::PrizePayout.as_str())
        .collect();
    assert_eq!(payouts.len(), 1);
}

#[sqlx::test]
async fn test_settle_from_wrong_status_is_a_race(pool: SqlitePool) {
    let app = TestApp::from_pool(pool).await;
    let user = funded_user(&app, 2000).await;
    let round = create_round(
        &app,
        round_spec(1000, 1, PayoutPlan::standard(PayoutType::WinnerTakesAll)),
    )
    .await;
    app.state
        .participation
        .join(round.id, user, false)
        .await
        .unwrap();
    drive_live(&app, round.id).await;

    // Still live: the ending -> settling claim cannot be taken.
    let live = app
        .state
        .round_repo
        .find_by_id(round.id)
        .await
        .unwrap()
        .unwrap();
    let attempt = app.state.settlement.settle(&live).await.unwrap();
    assert_eq!(attempt, SettleAttempt::Raced);
    assert_eq!(round_status(&app, round.id).await, RoundStatus::Live);
}

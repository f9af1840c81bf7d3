//! Settlement engine: computes winner ranking, applies the prize table and
//! issues payouts, exactly once per round.
//!
//! Exactly-once is layered: the `ending → settling` conditional update is
//! the claim (concurrent ticks lose the race and no-op); each payout is an
//! independent idempotent operation keyed on (round, user), so a retry
//! after partial failure resumes without double-paying; the outcome record
//! is unique per round. On failure the claim is released back to `ending`
//! and the next tick retries.

use crate::error::{AppResult, GameError};
use crate::models::{Round, RoundStatus};
use crate::notify::{GameEvent, GameNotifier};
use crate::repositories::{
    CommentRepository, OutcomeRepository, ParticipantRepository, RoundRepository, WalletRepository,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a settlement attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleAttempt {
    /// This call settled the round.
    Settled,
    /// Another invocation holds or completed the settlement; no-op.
    Raced,
}

pub struct SettlementService {
    round_repo: Arc<RoundRepository>,
    participant_repo: Arc<ParticipantRepository>,
    comment_repo: Arc<CommentRepository>,
    wallet_repo: Arc<WalletRepository>,
    outcome_repo: Arc<OutcomeRepository>,
    notifier: Arc<GameNotifier>,
}

impl SettlementService {
    pub fn new(
        round_repo: Arc<RoundRepository>,
        participant_repo: Arc<ParticipantRepository>,
        comment_repo: Arc<CommentRepository>,
        wallet_repo: Arc<WalletRepository>,
        outcome_repo: Arc<OutcomeRepository>,
        notifier: Arc<GameNotifier>,
    ) -> Self {
        Self {
            round_repo,
            participant_repo,
            comment_repo,
            wallet_repo,
            outcome_repo,
            notifier,
        }
    }

    /// Settle a round currently in `ending`. Safe to call concurrently and
    /// repeatedly: only the invocation that wins the settling claim does any
    /// work.
    pub async fn settle(&self, round: &Round) -> AppResult<SettleAttempt> {
        let claimed = self
            .round_repo
            .transition(round.id, RoundStatus::Ending, RoundStatus::Settling)
            .await?;
        if !claimed {
            return Ok(SettleAttempt::Raced);
        }

        match self.execute(round).await {
            Ok(winner_count) => {
                info!(round_id = %round.id, winner_count, "round settled");
                self.notifier.publish(GameEvent::RoundSettled {
                    round_id: round.id,
                    winner_count,
                });
                Ok(SettleAttempt::Settled)
            }
            Err(e) => {
                error!(round_id = %round.id, error = %e, "settlement failed, releasing claim for retry");
                let released = self
                    .round_repo
                    .transition(round.id, RoundStatus::Settling, RoundStatus::Ending)
                    .await?;
                if !released {
                    warn!(round_id = %round.id, "could not release settling claim");
                }
                Err(GameError::SettlementRetry(e.to_string()).into())
            }
        }
    }

    /// The settlement proper, run only by the claim holder. Returns the
    /// number of paid ranks.
    async fn execute(&self, round: &Round) -> AppResult<usize> {
        let pool_value = self.participant_repo.total_fees(round.id).await?;
        let effective_pool = if round.is_sponsored {
            pool_value + round.sponsored_amount
        } else {
            pool_value
        };

        let cut = round.platform_cut_decimal();
        let distributable = (Decimal::from(effective_pool) * (Decimal::ONE - cut))
            .floor()
            .to_i64()
            .unwrap_or(0);

        let distribution = round.distribution_vec();
        let ranked = self.comment_repo.ranked_commenters(round.id).await?;

        // Rank 1 is the most recent unique commenter. Fewer commenters than
        // distribution slots pays only the available ranks; a silent round
        // pays nobody. Undistributed money stays with the platform.
        let winners: Vec<(i64, uuid::Uuid, i64)> = ranked
            .iter()
            .take(distribution.len())
            .enumerate()
            .map(|(i, commenter)| {
                let prize = (Decimal::from(distributable) * distribution[i])
                    .floor()
                    .to_i64()
                    .unwrap_or(0);
                ((i + 1) as i64, commenter.user_id, prize)
            })
            .collect();

        for (position, user_id, amount) in &winners {
            if *amount == 0 {
                continue;
            }
            let paid = self
                .wallet_repo
                .pay_prize(
                    round.id,
                    *user_id,
                    *amount,
                    &format!("Prize payout - rank {}", position),
                )
                .await?;
            if !paid {
                // Retry after a partial failure: this winner was already
                // paid by an earlier attempt.
                info!(round_id = %round.id, user_id = %user_id, "payout already issued, skipping");
            }
        }

        self.outcome_repo
            .record(round.id, effective_pool, distributable, &winners)
            .await?;

        let finished = self
            .round_repo
            .transition(round.id, RoundStatus::Settling, RoundStatus::Settled)
            .await?;
        if !finished {
            // The claim was stolen (e.g. stale-claim release raced us). The
            // money side is idempotent, so whoever re-runs will converge.
            warn!(round_id = %round.id, "lost settling claim at finalization");
        }

        Ok(winners.len())
    }
}

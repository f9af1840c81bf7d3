//! Round creation and the client-facing read model.
//!
//! Every countdown a client renders is computed here, server-side, from the
//! round's absolute timestamps; clients only count a supplied number down
//! locally between polls and never decide game logic themselves.

use crate::config::GameConfig;
use crate::error::{AppError, AppResult, GameError};
use crate::models::{PayoutType, Round, RoundStatus};
use crate::repositories::{
    CommentRepository, NewRound, OutcomeRepository, ParticipantRepository, RoundRepository,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Payout shape validated once at round creation: the distribution length
/// must match the kind and the fractions must be positive and sum to
/// exactly 1.0. Downstream code never re-derives distributions from the
/// kind string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub kind: PayoutType,
    pub distribution: Vec<Decimal>,
}

impl PayoutPlan {
    /// Standard distribution for a payout kind.
    pub fn standard(kind: PayoutType) -> Self {
        let distribution = match kind {
            PayoutType::WinnerTakesAll => vec!["1.0"],
            PayoutType::Top3 => vec!["0.5", "0.3", "0.2"],
            PayoutType::Top5 => vec!["0.35", "0.25", "0.18", "0.12", "0.10"],
            PayoutType::Top10 => vec![
                "0.25", "0.18", "0.14", "0.11", "0.09", "0.07", "0.06", "0.05", "0.03", "0.02",
            ],
        };
        Self {
            kind,
            distribution: distribution
                .into_iter()
                .map(|s| s.parse().expect("static fraction"))
                .collect(),
        }
    }

    /// Validate length, positivity and exact sum.
    pub fn validate(&self) -> Result<(), String> {
        if self.distribution.len() != self.kind.winner_count() {
            return Err(format!(
                "{} requires {} fractions, got {}",
                self.kind.as_str(),
                self.kind.winner_count(),
                self.distribution.len()
            ));
        }
        if self.distribution.iter().any(|f| *f <= Decimal::ZERO) {
            return Err("distribution fractions must be positive".to_string());
        }
        let sum: Decimal = self.distribution.iter().sum();
        if sum != Decimal::ONE {
            return Err(format!("distribution must sum to 1.0, got {}", sum));
        }
        Ok(())
    }
}

/// Parameters for creating a round.
#[derive(Debug, Clone)]
pub struct CreateRound {
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub entry_open_at: DateTime<Utc>,
    pub live_start_at: DateTime<Utc>,
    pub comment_timer_seconds: i64,
    pub max_duration_minutes: i64,
    pub entry_fee: i64,
    pub is_sponsored: bool,
    pub sponsored_amount: i64,
    pub min_participants: i64,
    pub plan: PayoutPlan,
}

/// Snapshot of a round as served to clients: status, absolute timestamps
/// and server-computed countdowns.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub id: Uuid,
    pub status: RoundStatus,
    pub title: String,
    pub entry_open_at: DateTime<Utc>,
    pub live_start_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub live_end_at: Option<DateTime<Utc>>,
    pub participant_count: i64,
    pub entry_fee: i64,
    pub pool_value: i64,
    pub effective_prize_pool: i64,
    pub comment_count: i64,
    pub seconds_until_open: i64,
    pub seconds_until_live: i64,
    /// Remaining play time while live: the lesser of the hard cap and the
    /// rolling countdown. `None` before live; 0 once play has ended.
    pub seconds_remaining: Option<i64>,
    pub is_ending_soon: bool,
}

pub struct RoundService {
    round_repo: Arc<RoundRepository>,
    participant_repo: Arc<ParticipantRepository>,
    comment_repo: Arc<CommentRepository>,
    outcome_repo: Arc<OutcomeRepository>,
    config: GameConfig,
}

impl RoundService {
    pub fn new(
        round_repo: Arc<RoundRepository>,
        participant_repo: Arc<ParticipantRepository>,
        comment_repo: Arc<CommentRepository>,
        outcome_repo: Arc<OutcomeRepository>,
        config: GameConfig,
    ) -> Self {
        Self {
            round_repo,
            participant_repo,
            comment_repo,
            outcome_repo,
            config,
        }
    }

    /// Create a round after validating its payout plan, timing and money
    /// parameters. Rounds are born `scheduled`.
    pub async fn create(&self, spec: CreateRound) -> AppResult<Round> {
        spec.plan
            .validate()
            .map_err(|e| AppError::Validation(format!("invalid payout plan: {}", e)))?;

        if spec.entry_open_at > spec.live_start_at {
            return Err(AppError::Validation(
                "entry_open_at must not be after live_start_at".to_string(),
            ));
        }
        if spec.comment_timer_seconds <= 0 {
            return Err(AppError::Validation(
                "comment_timer_seconds must be positive".to_string(),
            ));
        }
        if spec.max_duration_minutes <= 0 {
            return Err(AppError::Validation(
                "max_duration_minutes must be positive".to_string(),
            ));
        }
        if spec.entry_fee < 0 || spec.sponsored_amount < 0 {
            return Err(AppError::Validation(
                "fees and sponsorship must be non-negative".to_string(),
            ));
        }
        if spec.sponsored_amount > 0 && !spec.is_sponsored {
            return Err(AppError::Validation(
                "sponsored_amount requires is_sponsored".to_string(),
            ));
        }
        if spec.min_participants < 1 {
            return Err(AppError::Validation(
                "min_participants must be at least 1".to_string(),
            ));
        }

        let platform_cut: Decimal = self
            .config
            .platform_cut
            .parse()
            .map_err(|_| AppError::Config("invalid platform cut".to_string()))?;

        let round = self
            .round_repo
            .create(&NewRound {
                title: spec.title,
                scheduled_at: spec.scheduled_at,
                entry_open_at: spec.entry_open_at,
                live_start_at: spec.live_start_at,
                comment_timer_seconds: spec.comment_timer_seconds,
                max_duration_minutes: spec.max_duration_minutes,
                entry_fee: spec.entry_fee,
                is_sponsored: spec.is_sponsored,
                sponsored_amount: spec.sponsored_amount,
                payout_type: spec.plan.kind,
                payout_distribution: spec.plan.distribution,
                platform_cut,
                min_participants: spec.min_participants,
            })
            .await?;

        info!(round_id = %round.id, title = %round.title, "round created");
        Ok(round)
    }

    /// Read-only round state, safe to poll.
    pub async fn snapshot(&self, round_id: Uuid) -> AppResult<RoundSnapshot> {
        let round = self
            .round_repo
            .find_by_id(round_id)
            .await?
            .ok_or(GameError::RoundNotFound)?;

        let now = Utc::now();
        let pool_value = self.participant_repo.total_fees(round_id).await?;
        let effective_prize_pool = if round.is_sponsored {
            pool_value + round.sponsored_amount
        } else {
            pool_value
        };
        let comment_count = self.comment_repo.count(round_id).await?;

        let status = round.status_enum();
        let seconds_until_open = clamp_secs(round.entry_open_at, now);
        let seconds_until_live = clamp_secs(round.live_start_at, now);

        let seconds_remaining = match status {
            RoundStatus::Live => Some(self.live_seconds_remaining(&round, now).await?),
            RoundStatus::Ending | RoundStatus::Settling | RoundStatus::Settled => Some(0),
            _ => None,
        };

        let is_ending_soon = matches!(
            seconds_remaining,
            Some(remaining) if status == RoundStatus::Live && remaining <= self.config.ending_soon_secs
        );

        Ok(RoundSnapshot {
            id: round.id,
            status,
            title: round.title.clone(),
            entry_open_at: round.entry_open_at,
            live_start_at: round.live_start_at,
            started_at: round.started_at,
            live_end_at: round.live_end_at,
            participant_count: round.participant_count,
            entry_fee: round.entry_fee,
            pool_value,
            effective_prize_pool,
            comment_count,
            seconds_until_open,
            seconds_until_live,
            seconds_remaining,
            is_ending_soon,
        })
    }

    /// All rounds still in play, for lobby views.
    pub async fn list_active(&self) -> AppResult<Vec<Round>> {
        Ok(self.round_repo.list_active().await?)
    }

    /// The settled outcome for a round, if any.
    pub async fn outcome(
        &self,
        round_id: Uuid,
    ) -> AppResult<Option<(crate::models::SettlementOutcome, Vec<crate::models::SettlementWinner>)>>
    {
        let outcome = match self.outcome_repo.find_by_round(round_id).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let winners = self.outcome_repo.winners(outcome.id).await?;
        Ok(Some((outcome, winners)))
    }

    /// Rolling countdown for a live round: time to the hard cap or to
    /// `comment_timer_seconds` past the last comment (or round start, before
    /// the first comment), whichever is smaller.
    async fn live_seconds_remaining(&self, round: &Round, now: DateTime<Utc>) -> AppResult<i64> {
        let hard_cap = round
            .live_end_at
            .map(|end| clamp_secs(end, now))
            .unwrap_or(i64::MAX);

        let anchor_ms = match self.comment_repo.last_comment_ms(round.id).await? {
            Some(ms) => Some(ms),
            None => round.started_at.map(|s| s.timestamp_millis()),
        };
        let countdown = match anchor_ms {
            Some(ms) => {
                let deadline_ms = ms + round.comment_timer_seconds * 1000;
                ((deadline_ms - now.timestamp_millis()).max(0) + 999) / 1000
            }
            None => i64::MAX,
        };

        Ok(hard_cap.min(countdown))
    }
}

fn clamp_secs(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (deadline - now).num_seconds().max(0)
}

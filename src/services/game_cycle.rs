//! Game-cycle state machine.
//!
//! Owns the round lifecycle: scheduled → open → live → ending →
//! settling/settled, with cancellation at live-start when too few joined.
//! The transition check is a pure function of the current server time and
//! stored round state; every transition is a conditional status update, so
//! overlapping ticks (cron overlap, retries, manual force calls) resolve to
//! exactly one winner and the rest no-op. Because deadlines derive from
//! absolute timestamps rather than counted ticks, a late tick after downtime
//! still transitions correctly.

use crate::config::GameConfig;
use crate::error::{AppError, AppResult, GameError};
use crate::models::{Round, RoundStatus};
use crate::notify::{GameEvent, GameNotifier};
use crate::repositories::{CommentRepository, ParticipantRepository, RoundRepository};
use crate::services::settlement::SettlementService;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct GameCycleService {
    round_repo: Arc<RoundRepository>,
    participant_repo: Arc<ParticipantRepository>,
    comment_repo: Arc<CommentRepository>,
    settlement: Arc<SettlementService>,
    notifier: Arc<GameNotifier>,
    config: GameConfig,
}

impl GameCycleService {
    pub fn new(
        round_repo: Arc<RoundRepository>,
        participant_repo: Arc<ParticipantRepository>,
        comment_repo: Arc<CommentRepository>,
        settlement: Arc<SettlementService>,
        notifier: Arc<GameNotifier>,
        config: GameConfig,
    ) -> Self {
        Self {
            round_repo,
            participant_repo,
            comment_repo,
            settlement,
            notifier,
            config,
        }
    }

    /// Run the transition check for every non-terminal round. Settlement
    /// failures are logged and left for the next pass; they never abort the
    /// sweep.
    pub async fn tick_all(&self) -> AppResult<()> {
        let rounds = self.round_repo.list_active().await?;
        for round in rounds {
            if let Err(e) = self.check(&round, Utc::now()).await {
                match &e {
                    AppError::Game(GameError::SettlementRetry(_)) => {
                        warn!(round_id = %round.id, error = %e, "settlement deferred to next tick");
                    }
                    _ => {
                        error!(round_id = %round.id, error = %e, "tick failed for round");
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the transition check for one round. This is also the manual
    /// force-transition entry point; calling it redundantly is safe. An
    /// incomplete settlement is an internal condition, retried on the next
    /// pass, and never surfaces to the caller.
    pub async fn tick(&self, round_id: uuid::Uuid) -> AppResult<()> {
        let round = self
            .round_repo
            .find_by_id(round_id)
            .await?
            .ok_or(GameError::RoundNotFound)?;
        match self.check(&round, Utc::now()).await {
            Err(AppError::Game(GameError::SettlementRetry(msg))) => {
                warn!(round_id = %round_id, error = %msg, "settlement deferred to next tick");
                Ok(())
            }
            other => other,
        }
    }

    /// Evaluate and perform at most the next due transition for a round.
    async fn check(&self, round: &Round, now: DateTime<Utc>) -> AppResult<()> {
        match round.status_enum() {
            RoundStatus::Scheduled => self.check_open(round, now).await,
            RoundStatus::Open => self.check_live(round, now).await,
            RoundStatus::Live => self.check_ending(round, now).await,
            RoundStatus::Ending => self.settle(round).await,
            RoundStatus::Settling => self.check_stale_settling(round, now).await,
            RoundStatus::Settled | RoundStatus::Cancelled => Ok(()),
        }
    }

    /// `scheduled → open` once the entry gate time is reached.
    async fn check_open(&self, round: &Round, now: DateTime<Utc>) -> AppResult<()> {
        if now < round.entry_open_at {
            return Ok(());
        }
        if self
            .round_repo
            .transition(round.id, RoundStatus::Scheduled, RoundStatus::Open)
            .await?
        {
            info!(round_id = %round.id, "round open for entry");
            self.notifier
                .publish(GameEvent::RoundOpened { round_id: round.id });
        }
        Ok(())
    }

    /// `open → live`, or `open → cancelled` (with refunds) when too few
    /// players joined by live start. Spectators do not count toward the
    /// minimum; only players fund the pool and can win.
    async fn check_live(&self, round: &Round, now: DateTime<Utc>) -> AppResult<()> {
        if now < round.live_start_at {
            return Ok(());
        }

        let players = self.participant_repo.player_count(round.id).await?;
        if players < round.min_participants {
            if self.round_repo.cancel_with_refunds(round.id).await? {
                info!(
                    round_id = %round.id,
                    players,
                    minimum = round.min_participants,
                    "round cancelled below minimum participation, entries refunded"
                );
                self.notifier
                    .publish(GameEvent::RoundCancelled { round_id: round.id });
            }
            return Ok(());
        }

        if self.round_repo.go_live(round.id, now).await? {
            info!(round_id = %round.id, "round live");
            self.notifier
                .publish(GameEvent::RoundLive { round_id: round.id });
            return Ok(());
        }

        Ok(())
    }

    /// `live → ending` at the hard duration cap, or when the rolling
    /// countdown since the last comment has expired (requires at least one
    /// comment; a silent round runs to the cap). Whichever fires first wins.
    /// On success the settlement attempt runs in the same tick.
    async fn check_ending(&self, round: &Round, now: DateTime<Utc>) -> AppResult<()> {
        let hard_cap_hit = match round.live_end_at {
            Some(end) => now >= end,
            None => false,
        };

        let countdown_expired = if hard_cap_hit {
            false
        } else {
            match self.comment_repo.last_comment_ms(round.id).await? {
                Some(last_ms) => {
                    now.timestamp_millis() >= last_ms + round.comment_timer_seconds * 1000
                }
                None => false,
            }
        };

        if !hard_cap_hit && !countdown_expired {
            return Ok(());
        }

        if self
            .round_repo
            .transition(round.id, RoundStatus::Live, RoundStatus::Ending)
            .await?
        {
            info!(
                round_id = %round.id,
                by_hard_cap = hard_cap_hit,
                "round ending"
            );
            self.notifier
                .publish(GameEvent::RoundEnding { round_id: round.id });
            // Settle eagerly rather than waiting one more tick.
            let refreshed = self
                .round_repo
                .find_by_id(round.id)
                .await?
                .ok_or(GameError::RoundNotFound)?;
            return self.settle(&refreshed).await;
        }

        Ok(())
    }

    async fn settle(&self, round: &Round) -> AppResult<()> {
        self.settlement.settle(round).await.map(|_| ())
    }

    /// A `settling` claim that outlived its holder (crash between claim and
    /// finish) is released back to `ending` for retry.
    async fn check_stale_settling(&self, round: &Round, now: DateTime<Utc>) -> AppResult<()> {
        let stale_before = now - Duration::seconds(self.config.stale_settling_secs);
        if round.status_changed_at >= stale_before {
            return Ok(());
        }
        if self
            .round_repo
            .transition(round.id, RoundStatus::Settling, RoundStatus::Ending)
            .await?
        {
            warn!(round_id = %round.id, "released stale settling claim");
        }
        Ok(())
    }
}

//! Participation registry: join and leave with entry-fee escrow.

use crate::error::{AppResult, GameError};
use crate::notify::{GameEvent, GameNotifier};
use crate::repositories::{JoinRow, LeaveRow, ParticipantRepository, RoundRepository};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Result of a join call. A duplicate join is an idempotent success, not an
/// error: `already_joined` is set and nothing further was charged.
#[derive(Debug, Clone, Copy)]
pub struct JoinOutcome {
    pub already_joined: bool,
    pub is_spectator: bool,
}

/// Result of a leave call.
#[derive(Debug, Clone, Copy)]
pub struct LeaveOutcome {
    pub refunded: bool,
    pub amount: i64,
}

pub struct ParticipationService {
    round_repo: Arc<RoundRepository>,
    participant_repo: Arc<ParticipantRepository>,
    notifier: Arc<GameNotifier>,
}

impl ParticipationService {
    pub fn new(
        round_repo: Arc<RoundRepository>,
        participant_repo: Arc<ParticipantRepository>,
        notifier: Arc<GameNotifier>,
    ) -> Self {
        Self {
            round_repo,
            participant_repo,
            notifier,
        }
    }

    /// Join a round. Players on paid rounds have the entry fee checked and
    /// debited atomically with the registry insert; spectators and zero-fee
    /// sponsored rounds skip the debit entirely.
    pub async fn join(
        &self,
        round_id: Uuid,
        user_id: Uuid,
        as_spectator: bool,
    ) -> AppResult<JoinOutcome> {
        let round = self
            .round_repo
            .find_by_id(round_id)
            .await?
            .ok_or(GameError::RoundNotFound)?;

        if !round.entry_open(Utc::now()) {
            return Err(GameError::RoundClosed.into());
        }

        let fee = if as_spectator { 0 } else { round.entry_fee };

        match self
            .participant_repo
            .join(round_id, user_id, as_spectator, fee)
            .await?
        {
            JoinRow::Inserted(p) => {
                info!(
                    round_id = %round_id,
                    user_id = %user_id,
                    spectator = p.is_spectator,
                    fee = p.fee_paid,
                    "participant joined"
                );
                self.notifier.publish(GameEvent::ParticipantJoined {
                    round_id,
                    user_id,
                    spectator: p.is_spectator,
                });
                Ok(JoinOutcome {
                    already_joined: false,
                    is_spectator: p.is_spectator,
                })
            }
            JoinRow::AlreadyJoined(p) => Ok(JoinOutcome {
                already_joined: true,
                is_spectator: p.is_spectator,
            }),
            JoinRow::RoundClosed => Err(GameError::RoundClosed.into()),
            JoinRow::InsufficientFunds => Err(GameError::InsufficientFunds.into()),
        }
    }

    /// Leave a round before it goes live. Any paid fee is refunded in the
    /// same transaction that removes the registry row; once the round is
    /// live there is no mid-round withdrawal.
    pub async fn leave(&self, round_id: Uuid, user_id: Uuid) -> AppResult<LeaveOutcome> {
        self.round_repo
            .find_by_id(round_id)
            .await?
            .ok_or(GameError::RoundNotFound)?;

        match self.participant_repo.leave(round_id, user_id).await? {
            LeaveRow::Removed { refunded } => {
                info!(
                    round_id = %round_id,
                    user_id = %user_id,
                    refunded,
                    "participant left"
                );
                self.notifier
                    .publish(GameEvent::ParticipantLeft { round_id, user_id });
                Ok(LeaveOutcome {
                    refunded: refunded > 0,
                    amount: refunded,
                })
            }
            LeaveRow::NotParticipant => Err(GameError::NotParticipant.into()),
            LeaveRow::TooLate => Err(GameError::TooLateToLeave.into()),
        }
    }
}

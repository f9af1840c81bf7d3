//! Comment stream: validated, server-timestamped, append-only posts.

use crate::config::GameConfig;
use crate::error::{AppResult, GameError};
use crate::models::{Comment, RoundStatus};
use crate::notify::{GameEvent, GameNotifier};
use crate::repositories::{CommentRepository, ParticipantRepository, RoundRepository};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct CommentService {
    round_repo: Arc<RoundRepository>,
    participant_repo: Arc<ParticipantRepository>,
    comment_repo: Arc<CommentRepository>,
    notifier: Arc<GameNotifier>,
    config: GameConfig,
}

impl CommentService {
    pub fn new(
        round_repo: Arc<RoundRepository>,
        participant_repo: Arc<ParticipantRepository>,
        comment_repo: Arc<CommentRepository>,
        notifier: Arc<GameNotifier>,
        config: GameConfig,
    ) -> Self {
        Self {
            round_repo,
            participant_repo,
            comment_repo,
            notifier,
            config,
        }
    }

    /// Post a comment to a live round. The appended row carries a
    /// server-assigned, per-round strictly-increasing timestamp, which
    /// implicitly resets the rolling countdown (computed on read).
    pub async fn post(&self, round_id: Uuid, user_id: Uuid, content: &str) -> AppResult<Comment> {
        let round = self
            .round_repo
            .find_by_id(round_id)
            .await?
            .ok_or(GameError::RoundNotFound)?;

        if round.status_enum() != RoundStatus::Live {
            return Err(GameError::RoundNotLive.into());
        }

        let participant = self
            .participant_repo
            .find(round_id, user_id)
            .await?
            .ok_or(GameError::NotParticipant)?;
        if !participant.is_player() {
            // Spectators watch; only players can comment (and win).
            return Err(GameError::NotParticipant.into());
        }

        let sanitized = sanitize(content);
        if sanitized.is_empty() {
            return Err(GameError::InvalidContent("empty after sanitization".to_string()).into());
        }
        if sanitized.chars().count() > self.config.max_comment_len {
            return Err(GameError::InvalidContent(format!(
                "exceeds {} characters",
                self.config.max_comment_len
            ))
            .into());
        }

        // The insert re-checks liveness atomically; a round that ended
        // between the read above and the write loses here.
        let comment = self
            .comment_repo
            .append(round_id, user_id, &sanitized)
            .await?
            .ok_or(GameError::RoundNotLive)?;

        debug!(round_id = %round_id, user_id = %user_id, seq = comment.seq, "comment posted");
        self.notifier.publish(GameEvent::CommentPosted {
            round_id,
            user_id,
            seq: comment.seq,
        });

        Ok(comment)
    }
}

/// Strip HTML tags and trim surrounding whitespace. Content between angle
/// brackets is dropped wholesale; an unclosed bracket drops the remainder.
fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

//! Fastest Finger Backend Library
//!
//! This module exposes the backend components for use by tests and other
//! consumers.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod notify;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, GameError};

use config::GameConfig;
use database::Database;
use notify::GameNotifier;
use repositories::*;
use services::*;
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub notifier: Arc<GameNotifier>,
    pub round_repo: Arc<RoundRepository>,
    pub participant_repo: Arc<ParticipantRepository>,
    pub comment_repo: Arc<CommentRepository>,
    pub wallet_repo: Arc<WalletRepository>,
    pub outcome_repo: Arc<OutcomeRepository>,
    pub rounds: Arc<RoundService>,
    pub participation: Arc<ParticipationService>,
    pub comments: Arc<CommentService>,
    pub settlement: Arc<SettlementService>,
    pub game_cycle: Arc<GameCycleService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::SqlitePool, game_config: GameConfig) -> Self {
        let database = Database::new(pool.clone());
        let notifier = Arc::new(GameNotifier::new());

        let round_repo = Arc::new(RoundRepository::new(pool.clone()));
        let participant_repo = Arc::new(ParticipantRepository::new(pool.clone()));
        let comment_repo = Arc::new(CommentRepository::new(pool.clone()));
        let wallet_repo = Arc::new(WalletRepository::new(pool.clone()));
        let outcome_repo = Arc::new(OutcomeRepository::new(pool));

        let rounds = Arc::new(RoundService::new(
            round_repo.clone(),
            participant_repo.clone(),
            comment_repo.clone(),
            outcome_repo.clone(),
            game_config.clone(),
        ));
        let participation = Arc::new(ParticipationService::new(
            round_repo.clone(),
            participant_repo.clone(),
            notifier.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            round_repo.clone(),
            participant_repo.clone(),
            comment_repo.clone(),
            notifier.clone(),
            game_config.clone(),
        ));
        let settlement = Arc::new(SettlementService::new(
            round_repo.clone(),
            participant_repo.clone(),
            comment_repo.clone(),
            wallet_repo.clone(),
            outcome_repo.clone(),
            notifier.clone(),
        ));
        let game_cycle = Arc::new(GameCycleService::new(
            round_repo.clone(),
            participant_repo.clone(),
            comment_repo.clone(),
            settlement.clone(),
            notifier.clone(),
            game_config,
        ));

        Self {
            database,
            notifier,
            round_repo,
            participant_repo,
            comment_repo,
            wallet_repo,
            outcome_repo,
            rounds,
            participation,
            comments,
            settlement,
            game_cycle,
        }
    }
}

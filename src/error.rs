use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Game rule violations surfaced to the caller
    #[error(transparent)]
    Game(#[from] GameError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Stable machine-readable code for client display, where one exists.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Game(g) => g.kind(),
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
            _ => "internal",
        }
    }
}

/// Game rule violations returned synchronously from join/leave/comment and
/// round operations. Each variant maps to a stable error kind that clients
/// render directly.
///
/// Concurrency races (a lost conditional status update, a duplicate tick)
/// are deliberately *not* part of this taxonomy: they are resolved
/// internally as no-ops and never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Round does not accept joins or leaves in its current state.
    #[error("Round is closed for entry")]
    RoundClosed,

    /// Wallet balance is below the entry fee.
    #[error("Insufficient balance for entry fee")]
    InsufficientFunds,

    /// The user never joined this round, or joined as a spectator where a
    /// player is required.
    #[error("Not a participant of this round")]
    NotParticipant,

    /// Leave requested at or after live start.
    #[error("Too late to leave: the round is already live")]
    TooLateToLeave,

    /// Comment posted while the round is not live.
    #[error("Round is not live")]
    RoundNotLive,

    /// Comment empty after sanitization or over the length bound.
    #[error("Invalid comment content: {0}")]
    InvalidContent(String),

    /// No round with the given id.
    #[error("Round not found")]
    RoundNotFound,

    /// Settlement could not complete; the next tick retries it. Internal.
    #[error("Settlement incomplete, will retry: {0}")]
    SettlementRetry(String),
}

impl GameError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::RoundClosed => "round_closed",
            GameError::InsufficientFunds => "insufficient_funds",
            GameError::NotParticipant => "not_participant",
            GameError::TooLateToLeave => "too_late_to_leave",
            GameError::RoundNotLive => "round_not_live",
            GameError::InvalidContent(_) => "invalid_content",
            GameError::RoundNotFound => "round_not_found",
            GameError::SettlementRetry(_) => "settlement_retry",
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Business rule violation (e.g., insufficient balance)
    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Message(format!("Duplicate: {}", msg)),
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
            RepositoryError::BusinessRule(msg) => AppError::Message(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                if db_err.is_unique_violation() {
                    RepositoryError::Duplicate(db_err.message().to_string())
                } else if db_err.is_foreign_key_violation() || db_err.is_check_violation() {
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else {
                    RepositoryError::Query(err)
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_kinds_are_stable() {
        assert_eq!(GameError::RoundClosed.kind(), "round_closed");
        assert_eq!(GameError::InsufficientFunds.kind(), "insufficient_funds");
        assert_eq!(GameError::TooLateToLeave.kind(), "too_late_to_leave");
        assert_eq!(
            GameError::InvalidContent("empty".into()).kind(),
            "invalid_content"
        );
    }

    #[test]
    fn test_app_error_kind_passthrough() {
        let err = AppError::Game(GameError::RoundNotLive);
        assert_eq!(err.kind(), "round_not_live");
        assert!(AppError::NotFound("x".into()).is_not_found());
    }
}

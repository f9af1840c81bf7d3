//! Domain models for the Fastest Finger backend.
//!
//! This module contains all database-backed models representing
//! the core entities of the comment-elimination game.

pub mod comment;
pub mod outcome;
pub mod participant;
pub mod round;
pub mod wallet;

// Re-export all models for convenient access
pub use comment::{Comment, RankedCommenter};
pub use outcome::{SettlementOutcome, SettlementWinner};
pub use participant::Participant;
pub use round::{PayoutType, Round, RoundStatus};
pub use wallet::{TransactionKind, Wallet, WalletTransaction};

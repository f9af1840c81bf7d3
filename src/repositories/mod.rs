pub mod comment_repository;
pub mod outcome_repository;
pub mod participant_repository;
pub mod round_repository;
pub mod wallet_repository;

pub use comment_repository::CommentRepository;
pub use outcome_repository::OutcomeRepository;
pub use participant_repository::{JoinRow, LeaveRow, ParticipantRepository};
pub use round_repository::{NewRound, RoundRepository};
pub use wallet_repository::WalletRepository;

pub mod comments;
pub mod game_cycle;
pub mod participation;
pub mod rounds;
pub mod settlement;
pub mod ticker;

pub use comments::CommentService;
pub use game_cycle::GameCycleService;
pub use participation::{JoinOutcome, LeaveOutcome, ParticipationService};
pub use rounds::{CreateRound, PayoutPlan, RoundService, RoundSnapshot};
pub use settlement::{SettleAttempt, SettlementService};
pub use ticker::Ticker;

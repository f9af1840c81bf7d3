use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Round lifecycle status.
///
/// Strictly forward-moving: scheduled → open → live → ending → settling →
/// settled, with cancelled reachable only from open. `settling` is the
/// internal settlement claim; `settled` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Scheduled,
    Open,
    Live,
    Ending,
    Settling,
    Settled,
    Cancelled,
}

impl RoundStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(RoundStatus::Scheduled),
            "open" => Ok(RoundStatus::Open),
            "live" => Ok(RoundStatus::Live),
            "ending" => Ok(RoundStatus::Ending),
            "settling" => Ok(RoundStatus::Settling),
            "settled" => Ok(RoundStatus::Settled),
            "cancelled" => Ok(RoundStatus::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Scheduled => "scheduled",
            RoundStatus::Open => "open",
            RoundStatus::Live => "live",
            RoundStatus::Ending => "ending",
            RoundStatus::Settling => "settling",
            RoundStatus::Settled => "settled",
            RoundStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundStatus::Settled | RoundStatus::Cancelled)
    }

    /// States in which join/leave is still allowed.
    pub fn accepts_entry(&self) -> bool {
        matches!(self, RoundStatus::Scheduled | RoundStatus::Open)
    }
}

impl From<String> for RoundStatus {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(RoundStatus::Scheduled)
    }
}

impl From<RoundStatus> for String {
    fn from(status: RoundStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Payout shape for a round. The number of winners is fixed by the kind;
/// the matching distribution is validated once at round creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutType {
    WinnerTakesAll,
    Top3,
    Top5,
    Top10,
}

impl PayoutType {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "winner_takes_all" => Ok(PayoutType::WinnerTakesAll),
            "top3" => Ok(PayoutType::Top3),
            "top5" => Ok(PayoutType::Top5),
            "top10" => Ok(PayoutType::Top10),
            _ => Err(format!("Invalid payout type: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutType::WinnerTakesAll => "winner_takes_all",
            PayoutType::Top3 => "top3",
            PayoutType::Top5 => "top5",
            PayoutType::Top10 => "top10",
        }
    }

    /// Number of ranked winners this payout type pays.
    pub fn winner_count(&self) -> usize {
        match self {
            PayoutType::WinnerTakesAll => 1,
            PayoutType::Top3 => 3,
            PayoutType::Top5 => 5,
            PayoutType::Top10 => 10,
        }
    }
}

/// Round model representing one game cycle.
///
/// Timestamps are server-clock absolutes; every countdown visible to clients
/// is derived from them on read. `started_at`/`live_end_at` are set when the
/// round actually goes live.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Round {
    pub id: Uuid,
    pub status: String, // Stored as TEXT, use RoundStatus enum for type safety
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub entry_open_at: DateTime<Utc>,
    pub live_start_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub live_end_at: Option<DateTime<Utc>>,
    pub comment_timer_seconds: i64,
    pub max_duration_minutes: i64,
    pub entry_fee: i64,
    pub is_sponsored: bool,
    pub sponsored_amount: i64,
    pub payout_type: String, // Stored as TEXT, use PayoutType enum for type safety
    pub payout_distribution: String, // JSON array of decimal-string fractions
    pub platform_cut: String, // Decimal-string fraction
    pub participant_count: i64,
    pub min_participants: i64,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Round {
    /// Get status as an enum
    pub fn status_enum(&self) -> RoundStatus {
        RoundStatus::from_str(&self.status).unwrap_or(RoundStatus::Scheduled)
    }

    /// Get payout type as an enum
    pub fn payout_type_enum(&self) -> PayoutType {
        PayoutType::from_str(&self.payout_type).unwrap_or(PayoutType::WinnerTakesAll)
    }

    /// Get the payout distribution as ordered fractions, rank 1 first.
    pub fn distribution_vec(&self) -> Vec<Decimal> {
        let raw: Vec<String> = serde_json::from_str(&self.payout_distribution).unwrap_or_default();
        raw.iter().filter_map(|s| s.parse().ok()).collect()
    }

    /// Get the platform cut as a fraction.
    pub fn platform_cut_decimal(&self) -> Decimal {
        self.platform_cut.parse().unwrap_or(Decimal::ZERO)
    }

    /// The hard duration cap as a chrono duration.
    pub fn max_duration(&self) -> Duration {
        Duration::minutes(self.max_duration_minutes)
    }

    /// Whether entry is currently open at `now`. Joins are allowed from
    /// scheduling up to live start, provided the status still permits it.
    pub fn entry_open(&self, now: DateTime<Utc>) -> bool {
        self.status_enum().accepts_entry() && now < self.live_start_at
    }
}

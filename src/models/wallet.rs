//! Wallet and ledger models for fund tracking.
//!
//! The transaction log is the source of truth; `Wallet.balance` is a cache
//! written only in the same database transaction as its ledger row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cached balance for a user, in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry kinds for fund movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    EntryDebit,
    EntryRefund,
    PrizePayout,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::EntryDebit => "entry_debit",
            Self::EntryRefund => "entry_refund",
            Self::PrizePayout => "prize_payout",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(Self::Deposit),
            "withdrawal" => Some(Self::Withdrawal),
            "entry_debit" => Some(Self::EntryDebit),
            "entry_refund" => Some(Self::EntryRefund),
            "prize_payout" => Some(Self::PrizePayout),
            _ => None,
        }
    }
}

/// Append-only ledger row. Amounts are signed: credits positive, debits
/// negative. Prize payouts are unique per (round, user), which is the
/// idempotency key that makes settlement retries safe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub round_id: Option<Uuid>,
    pub kind: String,
    pub amount: i64,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for k in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::EntryDebit,
            TransactionKind::EntryRefund,
            TransactionKind::PrizePayout,
        ] {
            assert_eq!(TransactionKind::from_str(k.as_str()), Some(k));
        }
        assert_eq!(TransactionKind::from_str("unknown"), None);
    }
}

//! Data models for Domino storage.
//!
//! Monetary columns are stored as decimal TEXT; `*Row` types mirror the
//! table layout and convert into the typed models.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub referrer_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReferralEdge {
    pub referrer_id: String,
    pub referred_id: String,
    pub created_at: i64,
}

/// Deposit lifecycle; only `Approved` counts toward qualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Approved,
    Failed,
}

impl DepositStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for DepositStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown deposit status {other:?}")),
        }
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commission lifecycle: `Pending -> Paid | Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Paid,
    Rejected,
}

impl CommissionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Rejected)
    }
}

impl FromStr for CommissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown commission status {other:?}")),
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub status: DepositStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct DepositRow {
    pub id: String,
    pub user_id: String,
    pub amount: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<DepositRow> for Deposit {
    type Error = DatabaseError;

    fn try_from(row: DepositRow) -> Result<Self, Self::Error> {
        Ok(Self {
            amount: decode_amount(&row.amount, "deposit", &row.id)?,
            status: row
                .status
                .parse()
                .map_err(|e| DatabaseError::Corrupt(format!("deposit {}: {e}", row.id)))?,
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub id: String,
    pub beneficiary_user_id: String,
    pub amount: Decimal,
    pub level: u32,
    pub status: CommissionStatus,
    pub triggering_event_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CommissionRow {
    pub id: String,
    pub beneficiary_user_id: String,
    pub amount: String,
    pub level: i64,
    pub status: String,
    pub triggering_event_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<CommissionRow> for Commission {
    type Error = DatabaseError;

    fn try_from(row: CommissionRow) -> Result<Self, Self::Error> {
        let level = u32::try_from(row.level)
            .ok()
            .filter(|l| *l >= 1)
            .ok_or_else(|| {
                DatabaseError::Corrupt(format!("commission {}: level {}", row.id, row.level))
            })?;
        Ok(Self {
            amount: decode_amount(&row.amount, "commission", &row.id)?,
            status: row
                .status
                .parse()
                .map_err(|e| DatabaseError::Corrupt(format!("commission {}: {e}", row.id)))?,
            level,
            id: row.id,
            beneficiary_user_id: row.beneficiary_user_id,
            triggering_event_id: row.triggering_event_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Deduplication record for a processed triggering event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AwardEvent {
    pub triggering_event_id: String,
    pub referred_user_id: String,
    pub commission_count: i64,
    pub created_at: i64,
}

/// Commission totals for one beneficiary, by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub beneficiary_user_id: String,
    pub pending: Decimal,
    pub paid: Decimal,
    pub rejected: Decimal,
    pub count: u64,
}

pub(crate) fn decode_amount(raw: &str, kind: &str, id: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(raw)
        .map_err(|e| DatabaseError::Corrupt(format!("{kind} {id}: amount {raw:?}: {e}")))
}

/// Add `amount` to a running ledger total, failing instead of overflowing.
pub(crate) fn add_amount(
    total: Decimal,
    amount: Decimal,
    kind: &str,
    id: &str,
) -> Result<Decimal, DatabaseError> {
    total
        .checked_add(amount)
        .ok_or_else(|| DatabaseError::Corrupt(format!("{kind} {id}: total overflows at {amount}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_roundtrip() {
        for s in [
            DepositStatus::Pending,
            DepositStatus::Approved,
            DepositStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<DepositStatus>().unwrap(), s);
        }
        assert!("settled".parse::<CommissionStatus>().is_err());
        assert!(CommissionStatus::Paid.is_terminal());
        assert!(!CommissionStatus::Pending.is_terminal());
    }

    #[test]
    fn corrupt_commission_row_is_rejected() {
        let row = CommissionRow {
            id: "c1".into(),
            beneficiary_user_id: "u1".into(),
            amount: "0.50".into(),
            level: 0,
            status: "pending".into(),
            triggering_event_id: "dep-1".into(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(
            Commission::try_from(row),
            Err(DatabaseError::Corrupt(_))
        ));

        let row = DepositRow {
            id: "d1".into(),
            user_id: "u1".into(),
            amount: "ten".into(),
            status: "approved".into(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(Deposit::try_from(row), Err(DatabaseError::Corrupt(_))));
    }
}

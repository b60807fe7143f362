//! Commission engine error types.

use crate::storage::DatabaseError;

/// Errors surfaced by the commission engine. None are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    /// A read against the referral graph or deposit ledger failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The referral chain is malformed (cycle, corrupt row).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The commission batch could not be written; nothing was committed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The trigger names an unknown user or does not match the ledger.
    #[error("Invalid trigger: {0}")]
    InvalidTrigger(String),
}

impl CommissionError {
    /// Map a failed read.
    pub(crate) fn read(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Corrupt(msg) => Self::DataIntegrity(msg),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }

    /// Map a failed write.
    pub(crate) fn write(e: &DatabaseError) -> Self {
        Self::Persistence(e.to_string())
    }

    /// Whether calling again with the same arguments may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Persistence(_))
    }
}

/// Errors from the payout workflow's settlement operation.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Commission not found: {0}")]
    NotFound(String),

    #[error("Commission {id} is already {status}")]
    AlreadySettled { id: String, status: String },

    #[error("Invalid settlement target: {0}")]
    InvalidTarget(String),

    #[error("Database error: {0}")]
    Database(String),
}

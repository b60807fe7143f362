//! Payout workflow surface over the commission ledger.
//!
//! The engine only creates pending rows; settlement into `paid` or
//! `rejected` happens here and nowhere else.

use tracing::info;

use crate::storage::{
    Commission, CommissionFilter, CommissionStatus, CommissionSummary, Database, DatabaseError,
};

use super::error::SettlementError;

pub struct PayoutLedger {
    db: Database,
}

impl PayoutLedger {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Pending commissions awaiting payout, oldest first.
    pub async fn pending(&self, limit: Option<u32>) -> Result<Vec<Commission>, SettlementError> {
        self.db
            .list_commissions(&CommissionFilter {
                status: Some(CommissionStatus::Pending),
                beneficiary_user_id: None,
                limit,
            })
            .await
            .map_err(|e| SettlementError::Database(e.to_string()))
    }

    /// Settle a pending commission as `paid` or `rejected`.
    pub async fn settle(
        &self,
        id: &str,
        status: CommissionStatus,
    ) -> Result<Commission, SettlementError> {
        if !status.is_terminal() {
            return Err(SettlementError::InvalidTarget(status.to_string()));
        }

        let transitioned = self
            .db
            .settle_commission(id, status)
            .await
            .map_err(|e| SettlementError::Database(e.to_string()))?;

        let commission = self.db.get_commission(id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => SettlementError::NotFound(id.to_string()),
            other => SettlementError::Database(other.to_string()),
        })?;

        if !transitioned {
            return Err(SettlementError::AlreadySettled {
                id: id.to_string(),
                status: commission.status.to_string(),
            });
        }

        info!(
            commission_id = %id,
            beneficiary = %commission.beneficiary_user_id,
            status = %status,
            amount = %commission.amount,
            "Commission settled"
        );
        Ok(commission)
    }

    /// Totals for one beneficiary.
    pub async fn summary(&self, beneficiary_user_id: &str) -> Result<CommissionSummary, SettlementError> {
        self.db
            .commission_summary(beneficiary_user_id)
            .await
            .map_err(|e| SettlementError::Database(e.to_string()))
    }
}

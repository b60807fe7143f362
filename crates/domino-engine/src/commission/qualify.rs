//! Qualification evaluation: deposit threshold and referral status.

use rust_decimal::Decimal;
use serde::Serialize;

use domino_core::CommissionSchedule;

use super::error::CommissionError;
use super::store::{DepositStore, ReferralStore};

/// A user's standing in the referral program. Pure read, no side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualification {
    pub user_id: String,
    /// Threshold met *and* the user was referred.
    pub qualifies: bool,
    /// Approved deposits reach the threshold.
    pub meets_threshold: bool,
    pub referrer_id: Option<String>,
    pub total_deposited: Decimal,
}

pub struct QualificationEvaluator<'a, S> {
    store: &'a S,
    schedule: &'a CommissionSchedule,
}

impl<'a, S: ReferralStore + DepositStore> QualificationEvaluator<'a, S> {
    pub const fn new(store: &'a S, schedule: &'a CommissionSchedule) -> Self {
        Self { store, schedule }
    }

    pub async fn evaluate(&self, user_id: &str) -> Result<Qualification, CommissionError> {
        let total_deposited = self
            .store
            .sum_approved_deposits(user_id)
            .await
            .map_err(CommissionError::read)?;
        let referrer_id = self
            .store
            .referrer_of(user_id)
            .await
            .map_err(CommissionError::read)?;

        let meets_threshold = self.schedule.meets_threshold(total_deposited);
        Ok(Qualification {
            user_id: user_id.to_string(),
            qualifies: meets_threshold && referrer_id.is_some(),
            meets_threshold,
            referrer_id,
            total_deposited,
        })
    }

    /// Whether an ancestor with this standing may receive a commission.
    pub const fn eligible_beneficiary(&self, q: &Qualification) -> bool {
        if self.schedule.require_referred_beneficiary {
            q.qualifies
        } else {
            q.meets_threshold
        }
    }
}

//! Engine store traits backed by the `SQLite` database.

use rust_decimal::Decimal;

use super::db::{Database, DatabaseError};
use super::models::{AwardEvent, Commission, Deposit};
use super::queries_commissions::{AwardParams, AwardWrite};
use crate::commission::{CommissionStore, DepositStore, ReferralStore};

impl ReferralStore for Database {
    async fn user_exists(&self, user_id: &str) -> Result<bool, DatabaseError> {
        Self::user_exists(self, user_id).await
    }

    async fn referrer_of(&self, user_id: &str) -> Result<Option<String>, DatabaseError> {
        self.get_referrer_of(user_id).await
    }
}

impl DepositStore for Database {
    async fn sum_approved_deposits(&self, user_id: &str) -> Result<Decimal, DatabaseError> {
        Self::sum_approved_deposits(self, user_id).await
    }

    async fn deposit(&self, deposit_id: &str) -> Result<Option<Deposit>, DatabaseError> {
        self.find_deposit(deposit_id).await
    }
}

impl CommissionStore for Database {
    async fn award_event(
        &self,
        triggering_event_id: &str,
    ) -> Result<Option<AwardEvent>, DatabaseError> {
        self.get_award_event(triggering_event_id).await
    }

    async fn commissions_for_event(
        &self,
        triggering_event_id: &str,
    ) -> Result<Vec<Commission>, DatabaseError> {
        self.list_commissions_for_event(triggering_event_id).await
    }

    async fn record_award(&self, params: &AwardParams<'_>) -> Result<AwardWrite, DatabaseError> {
        Self::record_award(self, params).await
    }
}

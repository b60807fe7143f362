//! Store seams injected into the commission engine.
//!
//! The engine never touches a database handle directly; it reads the
//! referral graph and deposit ledger and writes the commission ledger
//! through these traits. [`crate::storage::Database`] implements all three;
//! [`crate::forest::ReferralForest`] implements [`ReferralStore`].

use std::future::Future;

use rust_decimal::Decimal;

use crate::storage::{AwardEvent, AwardParams, AwardWrite, Commission, DatabaseError, Deposit};

/// Read access to the referral forest.
pub trait ReferralStore: Send + Sync {
    /// Whether the user is known.
    fn user_exists(&self, user_id: &str) -> impl Future<Output = Result<bool, DatabaseError>> + Send;

    /// The user's direct referrer, `None` for a root.
    fn referrer_of(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<String>, DatabaseError>> + Send;
}

/// Read access to the deposit ledger.
pub trait DepositStore: Send + Sync {
    /// Sum of the user's approved deposits.
    fn sum_approved_deposits(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Decimal, DatabaseError>> + Send;

    /// Look up a deposit by ID.
    fn deposit(
        &self,
        deposit_id: &str,
    ) -> impl Future<Output = Result<Option<Deposit>, DatabaseError>> + Send;
}

/// The commission ledger: the engine's only write target.
pub trait CommissionStore: Send + Sync {
    /// Award record for an event, if it was already processed.
    fn award_event(
        &self,
        triggering_event_id: &str,
    ) -> impl Future<Output = Result<Option<AwardEvent>, DatabaseError>> + Send;

    /// Rows written for an event, nearest level first.
    fn commissions_for_event(
        &self,
        triggering_event_id: &str,
    ) -> impl Future<Output = Result<Vec<Commission>, DatabaseError>> + Send;

    /// Claim the event and write its commissions atomically.
    fn record_award(
        &self,
        params: &AwardParams<'_>,
    ) -> impl Future<Output = Result<AwardWrite, DatabaseError>> + Send;
}

//! Commission engine: resolve, qualify, compute, and record once per event.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use domino_core::CommissionSchedule;
#[cfg(feature = "metrics")]
use domino_core::metrics::{self, AwardOutcome};

use super::chain::{ChainLink, ChainResolver};
use super::error::CommissionError;
use super::qualify::{Qualification, QualificationEvaluator};
use super::store::{CommissionStore, DepositStore, ReferralStore};
use crate::storage::{AwardEvent, AwardParams, AwardWrite, Commission, DepositStatus, NewCommission};

/// Outcome for one ancestor in the chain.
#[derive(Debug, Clone, Serialize)]
pub struct LevelDecision {
    pub link: ChainLink,
    pub ancestor: Qualification,
    /// `Some` when a commission is owed at this level.
    pub amount: Option<Decimal>,
}

/// Everything the engine decided for a triggering user, before any write.
#[derive(Debug, Clone, Serialize)]
pub struct AwardPlan {
    pub trigger: Qualification,
    pub levels: Vec<LevelDecision>,
}

impl AwardPlan {
    /// Commissions to write, nearest level first.
    pub fn commissions(&self) -> Vec<NewCommission> {
        self.levels
            .iter()
            .filter_map(|d| {
                d.amount.map(|amount| NewCommission {
                    beneficiary_user_id: d.link.ancestor_id.clone(),
                    amount,
                    level: d.link.level,
                })
            })
            .collect()
    }
}

/// The referral commission engine, generic over its stores.
pub struct CommissionEngine<S> {
    store: S,
    schedule: CommissionSchedule,
}

impl<S> CommissionEngine<S>
where
    S: ReferralStore + DepositStore + CommissionStore,
{
    pub const fn new(store: S, schedule: CommissionSchedule) -> Self {
        Self { store, schedule }
    }

    pub const fn schedule(&self) -> &CommissionSchedule {
        &self.schedule
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Ancestors of a user, nearest first.
    pub async fn resolve_chain(&self, user_id: &str) -> Result<Vec<ChainLink>, CommissionError> {
        ChainResolver::new(&self.store, self.schedule.max_chain_depth)
            .resolve(user_id)
            .await
    }

    /// Qualification standing of a single user.
    pub async fn evaluate(&self, user_id: &str) -> Result<Qualification, CommissionError> {
        QualificationEvaluator::new(&self.store, &self.schedule)
            .evaluate(user_id)
            .await
    }

    /// Decide every level's commission for `referred_user_id` without writing.
    pub async fn plan(&self, referred_user_id: &str) -> Result<AwardPlan, CommissionError> {
        self.ensure_known_user(referred_user_id).await?;

        let evaluator = QualificationEvaluator::new(&self.store, &self.schedule);
        let trigger = evaluator.evaluate(referred_user_id).await?;
        let chain = self.resolve_chain(referred_user_id).await?;

        let mut levels = Vec::with_capacity(chain.len());
        for link in chain {
            let ancestor = evaluator.evaluate(&link.ancestor_id).await?;
            let amount = if trigger.qualifies && evaluator.eligible_beneficiary(&ancestor) {
                Some(self.schedule.amount_for_level(link.level))
                    .filter(|amount| *amount > Decimal::ZERO)
            } else {
                None
            };
            debug!(
                user_id = %referred_user_id,
                ancestor_id = %link.ancestor_id,
                level = link.level,
                trigger_qualifies = trigger.qualifies,
                ancestor_total = %ancestor.total_deposited,
                amount = ?amount,
                "Level evaluated"
            );
            levels.push(LevelDecision {
                link,
                ancestor,
                amount,
            });
        }

        Ok(AwardPlan { trigger, levels })
    }

    /// Award commissions for a triggering event, at most once.
    ///
    /// A repeated call for the same event (sequential or concurrent) writes
    /// nothing and returns the rows the first call committed.
    pub async fn award(
        &self,
        triggering_event_id: &str,
        referred_user_id: &str,
    ) -> Result<Vec<Commission>, CommissionError> {
        if triggering_event_id.trim().is_empty() {
            return Err(CommissionError::InvalidTrigger(
                "empty triggering event id".into(),
            ));
        }

        if let Some(event) = self
            .store
            .award_event(triggering_event_id)
            .await
            .map_err(CommissionError::read)?
        {
            return self.replay(event, referred_user_id).await;
        }

        let plan = self.plan(referred_user_id).await?;
        let commissions = plan.commissions();
        let params = AwardParams {
            triggering_event_id,
            referred_user_id,
            commissions: &commissions,
        };

        match self.store.record_award(&params).await {
            Ok(AwardWrite::Committed(rows)) => {
                info!(
                    event_id = %triggering_event_id,
                    user_id = %referred_user_id,
                    chain_depth = plan.levels.len(),
                    commissions = rows.len(),
                    "Commissions awarded"
                );
                #[cfg(feature = "metrics")]
                metrics::record_award(AwardOutcome::Committed, rows.len() as u64);
                Ok(rows)
            }
            Ok(AwardWrite::AlreadyAwarded(event)) => {
                debug!(
                    event_id = %triggering_event_id,
                    "Concurrent award claimed the event first"
                );
                self.replay(event, referred_user_id).await
            }
            Err(e) => {
                warn!(
                    event_id = %triggering_event_id,
                    user_id = %referred_user_id,
                    error = %e,
                    "Commission batch not committed"
                );
                #[cfg(feature = "metrics")]
                metrics::record_award(AwardOutcome::Failed, 0);
                Err(CommissionError::write(&e))
            }
        }
    }

    /// Deposit-approval trigger. The deposit ID is the triggering event ID.
    pub async fn on_deposit_approved(
        &self,
        referred_user_id: &str,
        deposit_id: &str,
    ) -> Result<Vec<Commission>, CommissionError> {
        let deposit = self
            .store
            .deposit(deposit_id)
            .await
            .map_err(CommissionError::read)?
            .ok_or_else(|| CommissionError::InvalidTrigger(format!("unknown deposit {deposit_id}")))?;

        if deposit.user_id != referred_user_id {
            return Err(CommissionError::InvalidTrigger(format!(
                "deposit {deposit_id} belongs to {}, not {referred_user_id}",
                deposit.user_id
            )));
        }
        if deposit.status != DepositStatus::Approved {
            return Err(CommissionError::InvalidTrigger(format!(
                "deposit {deposit_id} is {}, not approved",
                deposit.status
            )));
        }

        self.award(deposit_id, referred_user_id).await
    }

    async fn ensure_known_user(&self, user_id: &str) -> Result<(), CommissionError> {
        if self
            .store
            .user_exists(user_id)
            .await
            .map_err(CommissionError::read)?
        {
            Ok(())
        } else {
            Err(CommissionError::InvalidTrigger(format!("unknown user {user_id}")))
        }
    }

    async fn replay(
        &self,
        event: AwardEvent,
        referred_user_id: &str,
    ) -> Result<Vec<Commission>, CommissionError> {
        if event.referred_user_id != referred_user_id {
            return Err(CommissionError::InvalidTrigger(format!(
                "event {} was awarded for {}, not {referred_user_id}",
                event.triggering_event_id, event.referred_user_id
            )));
        }

        let rows = self
            .store
            .commissions_for_event(&event.triggering_event_id)
            .await
            .map_err(CommissionError::read)?;
        info!(
            event_id = %event.triggering_event_id,
            commissions = rows.len(),
            "Award already recorded, returning existing commissions"
        );
        #[cfg(feature = "metrics")]
        metrics::record_award(AwardOutcome::Replayed, 0);
        Ok(rows)
    }
}

//! Referral commission engine.
//!
//! Resolves a triggering user's referral chain, gates each level on
//! qualification, computes the decaying commission, and records the batch
//! exactly once per triggering event.

mod chain;
mod engine;
mod error;
mod payout;
mod qualify;
mod store;

pub use chain::{ChainLink, ChainResolver};
pub use engine::{AwardPlan, CommissionEngine, LevelDecision};
pub use error::{CommissionError, SettlementError};
pub use payout::PayoutLedger;
pub use qualify::{Qualification, QualificationEvaluator};
pub use store::{CommissionStore, DepositStore, ReferralStore};

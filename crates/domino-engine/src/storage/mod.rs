//! `SQLite` storage for Domino.
//!
//! Provides persistence for the referral forest, the deposit ledger, and the
//! commission ledger with its per-event deduplication token.

mod db;
mod models;
mod queries;
mod queries_commissions;
mod store;


pub use db::{Database, DatabaseError};
pub use models::*;
pub use queries_commissions::{AwardParams, AwardWrite, CommissionFilter, NewCommission};

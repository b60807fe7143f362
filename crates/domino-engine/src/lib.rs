//! Domino Engine Library
//!
//! Core functionality for the Domino referral program:
//! - `SQLite` storage for the referral forest, deposits, and commissions
//! - Arena-indexed in-memory referral forest
//! - Commission engine: chain resolution, qualification, exactly-once awards
//! - Payout ledger for settling pending commissions

pub mod cli;
pub mod commission;
pub mod forest;
pub mod storage;

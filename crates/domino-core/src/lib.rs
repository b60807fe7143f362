//! Domino Core Library
//!
//! Shared functionality for Domino components:
//! - Configuration resolution and hierarchy
//! - Commission schedule (decay rule and qualification threshold)
//! - `SQLite` pool helpers and the shared `DatabaseError`
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod schedule;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use schedule::CommissionSchedule;

//! Database connection and initialization.

pub use domino_core::db::DatabaseError;

domino_core::define_database!(Database, "Ledger database migrations complete");

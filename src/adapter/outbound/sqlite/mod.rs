//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed [`LedgerStore`](crate::port::LedgerStore)
//! using Diesel ORM.

pub mod database;
pub mod store;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use store::SqliteStore;

//! Outbound adapters (driven side).

pub mod badge;
pub mod memory;
pub mod notifier;
pub mod sqlite;

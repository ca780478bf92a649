//! Wagerbook - pricing and settlement engine for credit-based prediction
//! markets.
//!
//! Users hold a balance of integer credits and wager on one of several
//! mutually exclusive outcomes of a market. An automated market maker
//! reprices every outcome after each wager; the odds at purchase are locked
//! into the wager and paid out when the market resolves.
//!
//! # Architecture
//!
//! - [`domain`] - Pure types, the pricing function and the credit ledger
//! - [`port`] - Traits at the seams: [`port::LedgerStore`],
//!   [`port::Notifier`], [`port::Clock`]
//! - [`application`] - The [`application::Engine`]: placement, resolution,
//!   cancellation, accounts, quotes and audits under per-market locks
//! - [`adapter`] - SQLite and in-memory stores, notifiers, the badge
//!   consumer and the CLI
//! - [`infrastructure`] - Configuration and runtime wiring
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use wagerbook::adapter::outbound::memory::MemoryStore;
//! use wagerbook::application::{event, Engine, EngineSettings};
//! use wagerbook::domain::{MarketId, NewMarket, NewOutcome, OutcomeId, UserId};
//!
//! let (tx, _rx) = event::channel(1_000);
//! let engine = Engine::new(EngineSettings::default(), Arc::new(MemoryStore::new()), tx);
//!
//! engine.create_market(NewMarket::try_new(
//!     MarketId::new("lunch"),
//!     "Tacos on Friday?",
//!     "",
//!     Utc::now() + Duration::days(3),
//!     vec![NewOutcome::new("yes", "Yes", 0.5), NewOutcome::new("no", "No", 0.5)],
//! )?)?;
//!
//! let alice = UserId::new("alice");
//! engine.open_account(&alice)?;
//! let placed = engine.place_bet(&alice, &MarketId::new("lunch"), &OutcomeId::new("yes"), 100)?;
//! assert_eq!(placed.potential_payout(), 200);
//! # Ok::<(), wagerbook::error::Error>(())
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

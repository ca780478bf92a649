//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! They are traits that adapters implement to integrate with external
//! systems (databases, notification consumers, clocks).
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │   (Engine + ledgers)    │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │  Clock  │            │ LedgerStore │              │ Notifier  │
//! │         │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`LedgerStore`] - Atomic persistence of transaction write sets
//! - [`Notifier`] - Event consumers (logging, badges, ...)
//! - [`Clock`] - Time source for deadlines and timestamps

pub mod outbound;

pub use outbound::clock::{Clock, SystemClock};
pub use outbound::notifier::{
    BetPlacedEvent, BetResolvedEvent, Event, LeaderboardEvent, MarketSettledEvent, Notifier,
};
pub use outbound::store::LedgerStore;

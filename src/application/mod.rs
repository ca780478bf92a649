//! Application layer: the transactional engine over domain state.
//!
//! [`Engine`] is split across files by operation; each file adds one
//! `impl Engine` block.

mod accounts;
mod audit;
mod cancellation;
mod engine;
mod placement;
mod quote;
mod resolution;

pub mod event;

pub use cancellation::Cancellation;
pub use engine::{Engine, EngineSettings};
pub use event::{EventReceiver, EventSender};
pub use placement::PlacedWager;
pub use quote::{BetQuote, QuotedOutcome};
pub use resolution::{Resolution, SettlementSummary};

//! Pure domain logic: identifiers, market state, the AMM pricing function
//! and the credit ledger. No I/O.

mod account;
mod changeset;
mod error;
mod id;
mod ledger;
mod market;
mod money;
mod wager;

pub mod pricing;

pub use account::{month_start, Account, AccountRow, EntryKind, LedgerEntry};
pub use changeset::{Changeset, Snapshot};
pub use error::DomainError;
pub use id::{EntryId, MarketId, OutcomeId, UserId, WagerId};
pub use ledger::{AuditReport, MarketLedger};
pub use market::{Market, MarketStatus, NewMarket, NewOutcome, Outcome, MAX_OUTCOMES, MIN_OUTCOMES};
pub use money::Credits;
pub use pricing::{DriftPolicy, PriceMove, PricingInput};
pub use wager::{Wager, WagerSettlement, ALL_IN_SHARE};

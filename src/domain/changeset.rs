//! Write sets exchanged with the ledger store.

use serde::Serialize;

use super::account::{AccountRow, LedgerEntry};
use super::market::Market;
use super::wager::Wager;

/// Everything one transaction writes. Persisted atomically, then applied
/// in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changeset {
    /// Full market rows (with outcomes) to upsert.
    pub markets: Vec<Market>,
    /// Account rows to upsert.
    pub accounts: Vec<AccountRow>,
    /// New ledger entries to append.
    pub entries: Vec<LedgerEntry>,
    /// New or re-settled wagers to upsert.
    pub wagers: Vec<Wager>,
}

impl Changeset {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.accounts.is_empty()
            && self.entries.is_empty()
            && self.wagers.is_empty()
    }

    /// Changeset touching a single market row.
    #[must_use]
    pub fn market(market: Market) -> Self {
        Self {
            markets: vec![market],
            ..Self::default()
        }
    }
}

/// Full persisted state, as returned by a store load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub markets: Vec<Market>,
    pub wagers: Vec<Wager>,
    pub accounts: Vec<AccountRow>,
    /// Ledger entries ordered by creation time.
    pub entries: Vec<LedgerEntry>,
}

//! Persistence port for the credit ledger.

use crate::domain::{Changeset, Snapshot};
use crate::error::Result;

/// Durable storage for markets, wagers, accounts and ledger entries.
///
/// `commit` is all-or-nothing: either every row of the changeset is
/// persisted or none is.
pub trait LedgerStore: Send + Sync {
    /// Persist one transaction's write set atomically.
    fn commit(&self, changes: &Changeset) -> Result<()>;

    /// Load the full persisted state.
    fn load(&self) -> Result<Snapshot>;
}

//! In-memory ledger store.
//!
//! Used by the `simulate` command and by tests. Rows are upserted by key
//! exactly like the SQLite store, so [`LedgerStore::load`] returns the same
//! shape of snapshot.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::domain::{Changeset, Snapshot};
use crate::error::{Error, Result};
use crate::port::LedgerStore;

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    commits: Vec<Changeset>,
}

/// Ledger store that keeps every row in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously persisted rows.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot,
                commits: Vec::new(),
            }),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Every changeset committed so far, oldest first.
    #[must_use]
    pub fn commits(&self) -> Vec<Changeset> {
        self.state.lock().commits.clone()
    }

    /// Make the next commit fail without writing anything.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl LedgerStore for MemoryStore {
    fn commit(&self, changes: &Changeset) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Database("injected commit failure".into()));
        }

        let mut state = self.state.lock();
        let snapshot = &mut state.snapshot;
        if let Some(entry) = changes
            .entries
            .iter()
            .find(|e| snapshot.entries.iter().any(|existing| existing.id == e.id))
        {
            return Err(Error::Database(format!("duplicate ledger entry {}", entry.id)));
        }

        for market in &changes.markets {
            match snapshot.markets.iter_mut().find(|m| m.id == market.id) {
                Some(slot) => *slot = market.clone(),
                None => snapshot.markets.push(market.clone()),
            }
        }
        for account in &changes.accounts {
            match snapshot.accounts.iter_mut().find(|a| a.user_id == account.user_id) {
                Some(slot) => *slot = account.clone(),
                None => snapshot.accounts.push(account.clone()),
            }
        }
        for wager in &changes.wagers {
            match snapshot.wagers.iter_mut().find(|w| w.id == wager.id) {
                Some(slot) => *slot = wager.clone(),
                None => snapshot.wagers.push(wager.clone()),
            }
        }
        snapshot.entries.extend(changes.entries.iter().cloned());
        state.commits.push(changes.clone());
        Ok(())
    }

    fn load(&self) -> Result<Snapshot> {
        Ok(self.state.lock().snapshot.clone())
    }
}

//! Account opening, bonuses and balance reads.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::engine::Engine;
use crate::domain::{Account, Changeset, Credits, EntryKind, LedgerEntry, UserId};
use crate::error::{LedgerError, Result};
use crate::port::{Event, LeaderboardEvent};

impl Engine {
    /// Open an account funded with the signup bonus.
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` for a duplicate id, or a store error.
    pub fn open_account(&self, user_id: &UserId) -> Result<Account> {
        let now = self.now();
        let handle = Arc::new(Mutex::new(Account::empty(user_id.clone(), now)));

        // Registered locked; concurrent lookups wait on the account lock,
        // not on the map, while the signup bonus is committed.
        let mut account = handle.lock();
        match self.accounts.entry(user_id.clone()) {
            Entry::Occupied(_) => {
                debug!(user_id = %user_id, "duplicate account rejected");
                return Err(LedgerError::AccountExists(user_id.clone()).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&handle));
            }
        }

        let bonus = self.settings.signup_bonus;
        let entries: Vec<LedgerEntry> = account
            .draft_entry(0, EntryKind::SignupBonus, bonus, None, "Signup bonus", now)
            .filter(|_| bonus > 0)
            .into_iter()
            .collect();

        let committed = self.store.commit(&Changeset {
            accounts: vec![account.projected(&entries)],
            entries: entries.clone(),
            ..Changeset::default()
        });
        if let Err(err) = committed {
            self.accounts.remove(user_id);
            return Err(err);
        }

        for entry in entries {
            account.apply(entry);
        }
        info!(user_id = %user_id, balance = account.balance(), "account opened");
        Ok(account.clone())
    }

    /// Credit the monthly bonus, at most once per UTC calendar month.
    ///
    /// # Errors
    ///
    /// Returns `BonusUnavailable` if already claimed this month,
    /// `AccountNotFound`, `Contention`, or a store error.
    pub fn claim_monthly_bonus(&self, user_id: &UserId) -> Result<LedgerEntry> {
        let handle = self.account_handle(user_id)?;
        let mut account = self.lock_account(&handle, user_id, self.settings.lock_timeout)?;

        let now = self.now();
        if !account.monthly_bonus_available(now) {
            debug!(user_id = %user_id, "monthly bonus already claimed");
            return Err(LedgerError::BonusUnavailable(user_id.clone()).into());
        }

        let amount = self.settings.monthly_bonus;
        let entry = account
            .draft_entry(
                account.balance(),
                EntryKind::MonthlyBonus,
                amount,
                None,
                "Monthly bonus",
                now,
            )
            .ok_or(LedgerError::InvalidAmount { amount })?;

        self.store.commit(&Changeset {
            accounts: vec![account.projected([&entry])],
            entries: vec![entry.clone()],
            ..Changeset::default()
        })?;
        account.apply(entry.clone());

        info!(user_id = %user_id, amount, balance = entry.balance_after, "monthly bonus claimed");
        Ok(entry)
    }

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `Contention`.
    pub fn balance(&self, user_id: &UserId) -> Result<Credits> {
        let handle = self.account_handle(user_id)?;
        let account = self.lock_account(&handle, user_id, self.settings.lock_timeout)?;
        Ok(account.balance())
    }

    /// Ledger history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` or `Contention`.
    pub fn ledger_entries(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>> {
        let handle = self.account_handle(user_id)?;
        let account = self.lock_account(&handle, user_id, self.settings.lock_timeout)?;
        Ok(account.history().to_vec())
    }

    /// Forward an externally computed leaderboard rank to event consumers.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for unknown users.
    pub fn report_leaderboard_rank(&self, user_id: &UserId, rank: u32) -> Result<()> {
        if !self.accounts.contains_key(user_id) {
            return Err(LedgerError::AccountNotFound(user_id.clone()).into());
        }
        self.events.publish(Event::LeaderboardUpdate(LeaderboardEvent {
            user_id: user_id.clone(),
            rank,
            as_of: self.now(),
        }));
        Ok(())
    }
}

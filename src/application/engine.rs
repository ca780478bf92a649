//! The engine facade: in-memory market and account state guarded by
//! per-market and per-account locks, backed by a [`LedgerStore`].
//!
//! Every transaction follows the same shape:
//!
//! 1. take the market lock, then account locks in ascending `UserId` order
//! 2. validate against live state and plan a [`Changeset`]
//! 3. commit the changeset to the store
//! 4. apply it in memory (cannot fail)
//! 5. release the locks and publish events
//!
//! A store failure at step 3 leaves memory untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::event::EventSender;
use crate::domain::{
    Account, AuditReport, Changeset, Credits, DriftPolicy, LedgerEntry, Market, MarketId,
    MarketLedger, MarketStatus, NewMarket, UserId, Wager,
};
use crate::error::{LedgerError, Result};
use crate::port::{Clock, LedgerStore, SystemClock};

/// Runtime knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Max wait for locks during placement, bonuses and reads.
    pub lock_timeout: Duration,
    /// Max wait for locks during resolution, cancellation and closing.
    pub settlement_lock_timeout: Duration,
    pub drift: DriftPolicy,
    pub signup_bonus: Credits,
    pub monthly_bonus: Credits,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
            settlement_lock_timeout: Duration::from_millis(5_000),
            drift: DriftPolicy::Preserve,
            signup_bonus: 1_000,
            monthly_bonus: 200,
        }
    }
}

pub(super) type LedgerHandle = Arc<Mutex<MarketLedger>>;
pub(super) type AccountHandle = Arc<Mutex<Account>>;

/// Pricing and settlement engine.
pub struct Engine {
    pub(super) markets: DashMap<MarketId, LedgerHandle>,
    pub(super) accounts: DashMap<UserId, AccountHandle>,
    pub(super) store: Arc<dyn LedgerStore>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) events: EventSender,
    pub(super) settings: EngineSettings,
}

impl Engine {
    /// Create an empty engine.
    #[must_use]
    pub fn new(settings: EngineSettings, store: Arc<dyn LedgerStore>, events: EventSender) -> Self {
        Self {
            markets: DashMap::new(),
            accounts: DashMap::new(),
            store,
            clock: Arc::new(SystemClock),
            events,
            settings,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Hydrate an engine from the store and audit every market.
    ///
    /// Markets that fail the audit are halted (and the halt persisted);
    /// their reports are returned alongside the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(
        settings: EngineSettings,
        store: Arc<dyn LedgerStore>,
        events: EventSender,
    ) -> Result<(Self, Vec<AuditReport>)> {
        let snapshot = store.load()?;
        let engine = Self::new(settings, store, events);

        let mut wagers_by_market: HashMap<MarketId, Vec<Wager>> = HashMap::new();
        for wager in snapshot.wagers {
            wagers_by_market
                .entry(wager.market_id.clone())
                .or_default()
                .push(wager);
        }
        let mut entries_by_user: HashMap<UserId, Vec<LedgerEntry>> = HashMap::new();
        for entry in snapshot.entries {
            entries_by_user
                .entry(entry.user_id.clone())
                .or_default()
                .push(entry);
        }

        for row in snapshot.accounts {
            let history = entries_by_user.remove(&row.user_id).unwrap_or_default();
            let user_id = row.user_id.clone();
            engine
                .accounts
                .insert(user_id, Arc::new(Mutex::new(Account::from_parts(row, history))));
        }

        let mut reports = Vec::new();
        for market in snapshot.markets {
            let wagers = wagers_by_market.remove(&market.id).unwrap_or_default();
            let mut ledger = MarketLedger::from_parts(market, wagers);
            let report = ledger.audit();
            if !report.is_consistent() && ledger.market().halted_reason.is_none() {
                engine.halt(&mut ledger, &report);
            }
            reports.push(report);
            let id = ledger.market().id.clone();
            engine.markets.insert(id, Arc::new(Mutex::new(ledger)));
        }

        info!(
            markets = engine.markets.len(),
            accounts = engine.accounts.len(),
            "engine restored"
        );
        Ok((engine, reports))
    }

    /// Current time according to the engine's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The queue events are published to.
    #[must_use]
    pub const fn events(&self) -> &EventSender {
        &self.events
    }

    /// Create and persist a new open market.
    ///
    /// # Errors
    ///
    /// Returns `MarketExists` for a duplicate id, or a store error.
    pub fn create_market(&self, definition: NewMarket) -> Result<Market> {
        let id = definition.id().clone();
        let market = Market::open(definition, self.now());
        let handle: LedgerHandle = Arc::new(Mutex::new(MarketLedger::new(market.clone())));

        // Registered locked, so lookups during the commit see `Contention`
        // rather than a market that may never be persisted.
        let ledger = handle.lock();
        match self.markets.entry(id.clone()) {
            Entry::Occupied(_) => {
                debug!(market_id = %id, "duplicate market rejected");
                return Err(LedgerError::MarketExists(id).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&handle));
            }
        }

        let committed = self.store.commit(&Changeset::market(market.clone()));
        if committed.is_err() {
            self.markets.remove(&id);
        }
        drop(ledger);
        committed?;

        info!(
            market_id = %market.id,
            outcomes = market.outcomes.len(),
            closes_at = %market.closes_at,
            "market created"
        );
        Ok(market)
    }

    /// Stop accepting wagers on a market.
    ///
    /// Closing an already closed market is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyResolved` / `AlreadyCancelled` for terminal markets,
    /// `InconsistentState` for halted ones, `Contention` or a store error.
    pub fn close_market(&self, market_id: &MarketId) -> Result<MarketStatus> {
        let handle = self.market_handle(market_id)?;
        let mut ledger = self.lock_market(&handle, market_id, self.settings.settlement_lock_timeout)?;
        Self::ensure_not_halted(&ledger)?;

        match ledger.market().status {
            MarketStatus::Closed => return Ok(MarketStatus::Closed),
            MarketStatus::Resolved => {
                return Err(LedgerError::AlreadyResolved(market_id.clone()).into())
            }
            MarketStatus::Cancelled => {
                return Err(LedgerError::AlreadyCancelled(market_id.clone()).into())
            }
            MarketStatus::Open => {}
        }

        self.mark_closed(&mut ledger)?;
        Ok(MarketStatus::Closed)
    }

    /// Close every open market whose deadline has passed.
    ///
    /// Status and deadline are re-checked under the market lock, so markets
    /// settled or halted since the sweep began are skipped. Store failures
    /// are logged and skipped.
    pub fn close_expired(&self) -> Vec<MarketId> {
        let now = self.now();
        self.market_ids()
            .into_iter()
            .filter(|id| match self.close_if_expired(id, now) {
                Ok(closed) => closed,
                Err(err) => {
                    warn!(market_id = %id, error = %err, "failed to close expired market");
                    false
                }
            })
            .collect()
    }

    fn close_if_expired(&self, market_id: &MarketId, now: DateTime<Utc>) -> Result<bool> {
        let handle = self.market_handle(market_id)?;
        let mut ledger = self.lock_market(&handle, market_id, self.settings.settlement_lock_timeout)?;
        let market = ledger.market();
        if market.status != MarketStatus::Open
            || market.halted_reason.is_some()
            || market.closes_at > now
        {
            return Ok(false);
        }
        self.mark_closed(&mut ledger)?;
        Ok(true)
    }

    fn mark_closed(&self, ledger: &mut MarketLedger) -> Result<()> {
        let mut next = ledger.market().clone();
        next.status = MarketStatus::Closed;
        self.store.commit(&Changeset::market(next.clone()))?;
        let market_id = next.id.clone();
        ledger.absorb(next, &[]);
        info!(market_id = %market_id, "market closed");
        Ok(())
    }

    /// Snapshot of a market.
    ///
    /// # Errors
    ///
    /// Returns `MarketNotFound` or `Contention`.
    pub fn market(&self, market_id: &MarketId) -> Result<Market> {
        let handle = self.market_handle(market_id)?;
        let ledger = self.lock_market(&handle, market_id, self.settings.lock_timeout)?;
        Ok(ledger.market().clone())
    }

    /// Snapshot of every wager on a market, in placement order.
    ///
    /// # Errors
    ///
    /// Returns `MarketNotFound` or `Contention`.
    pub fn wagers(&self, market_id: &MarketId) -> Result<Vec<Wager>> {
        let handle = self.market_handle(market_id)?;
        let ledger = self.lock_market(&handle, market_id, self.settings.lock_timeout)?;
        Ok(ledger.wagers().to_vec())
    }

    /// Every known market id, sorted.
    #[must_use]
    pub fn market_ids(&self) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self.markets.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub(super) fn market_handle(&self, market_id: &MarketId) -> Result<LedgerHandle> {
        self.markets
            .get(market_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::MarketNotFound(market_id.clone()).into())
    }

    pub(super) fn account_handle(&self, user_id: &UserId) -> Result<AccountHandle> {
        self.accounts
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::AccountNotFound(user_id.clone()).into())
    }

    /// Lock a market handle.
    ///
    /// A handle whose creation was rolled back while the caller waited is
    /// reported as `MarketNotFound`.
    pub(super) fn lock_market<'a>(
        &self,
        handle: &'a LedgerHandle,
        market_id: &MarketId,
        timeout: Duration,
    ) -> Result<MutexGuard<'a, MarketLedger>> {
        let guard = handle.try_lock_for(timeout).ok_or_else(|| {
            warn!(market_id = %market_id, ?timeout, "market lock timed out");
            LedgerError::Contention {
                resource: format!("market {market_id}"),
            }
        })?;
        let registered = self
            .markets
            .get(market_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle));
        if !registered {
            return Err(LedgerError::MarketNotFound(market_id.clone()).into());
        }
        Ok(guard)
    }

    pub(super) fn lock_account<'a>(
        &self,
        handle: &'a AccountHandle,
        user_id: &UserId,
        timeout: Duration,
    ) -> Result<MutexGuard<'a, Account>> {
        let guard = handle.try_lock_for(timeout).ok_or_else(|| {
            warn!(user_id = %user_id, ?timeout, "account lock timed out");
            LedgerError::Contention {
                resource: format!("account {user_id}"),
            }
        })?;
        let registered = self
            .accounts
            .get(user_id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), handle));
        if !registered {
            return Err(LedgerError::AccountNotFound(user_id.clone()).into());
        }
        Ok(guard)
    }

    /// Account handles for `users`, which must already be sorted.
    pub(super) fn account_handles(&self, users: &[UserId]) -> Result<Vec<AccountHandle>> {
        users.iter().map(|u| self.account_handle(u)).collect()
    }

    /// Lock `handles` in order.
    pub(super) fn lock_accounts<'a>(
        &self,
        users: &[UserId],
        handles: &'a [AccountHandle],
        timeout: Duration,
    ) -> Result<Vec<MutexGuard<'a, Account>>> {
        users
            .iter()
            .zip(handles)
            .map(|(user, handle)| self.lock_account(handle, user, timeout))
            .collect()
    }

    pub(super) fn ensure_not_halted(ledger: &MarketLedger) -> Result<()> {
        match &ledger.market().halted_reason {
            Some(reason) => Err(LedgerError::InconsistentState {
                market_id: ledger.market().id.clone(),
                reason: reason.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Audit a locked ledger, halting it on failure.
    pub(super) fn verify(&self, ledger: &mut MarketLedger) -> Result<AuditReport> {
        Self::ensure_not_halted(ledger)?;
        let report = ledger.audit();
        if report.is_consistent() {
            return Ok(report);
        }
        let reason = self.halt(ledger, &report);
        Err(LedgerError::InconsistentState {
            market_id: report.market_id,
            reason,
        }
        .into())
    }

    fn halt(&self, ledger: &mut MarketLedger, report: &AuditReport) -> String {
        let reason = report.violations.join("; ");
        error!(market_id = %report.market_id, reason = %reason, "market failed audit, halting");

        let mut halted = ledger.market().clone();
        halted.halted_reason = Some(reason.clone());
        if let Err(err) = self.store.commit(&Changeset::market(halted)) {
            error!(market_id = %report.market_id, error = %err, "failed to persist market halt");
        }
        ledger.halt(reason.clone());
        reason
    }
}

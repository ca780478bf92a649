//! Market cancellation: refund every stake as one batch.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use super::engine::Engine;
use super::resolution::SettlementSummary;
use crate::domain::{
    Changeset, Credits, EntryKind, LedgerEntry, MarketId, MarketStatus, UserId, WagerSettlement,
};
use crate::error::{LedgerError, Result};
use crate::port::{Event, MarketSettledEvent};

/// Result of a cancel call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Cancellation {
    /// Stakes were refunded by this call.
    Cancelled(SettlementSummary),
    /// The market was already cancelled; nothing changed.
    AlreadyCancelled,
}

impl Engine {
    /// Void a market and refund every wager's original amount.
    ///
    /// All refunds are committed together with the status change; a failure
    /// leaves every balance and the market untouched.
    ///
    /// # Errors
    ///
    /// - `MarketNotFound`
    /// - `AlreadyResolved` for resolved markets
    /// - `InconsistentState` if the market fails its audit (it is halted)
    /// - `AccountNotFound` if a bettor's account is missing
    /// - `Contention`, or a store error; nothing was changed
    pub fn cancel_market(&self, market_id: &MarketId, reason: &str) -> Result<Cancellation> {
        let timeout = self.settings.settlement_lock_timeout;
        let handle = self.market_handle(market_id)?;
        let mut ledger = self.lock_market(&handle, market_id, timeout)?;
        Self::ensure_not_halted(&ledger)?;

        match ledger.market().status {
            MarketStatus::Cancelled => {
                info!(market_id = %market_id, "market already cancelled, skipping");
                return Ok(Cancellation::AlreadyCancelled);
            }
            MarketStatus::Resolved => {
                return Err(LedgerError::AlreadyResolved(market_id.clone()).into())
            }
            MarketStatus::Open | MarketStatus::Closed => {}
        }

        self.verify(&mut ledger)?;

        let users = ledger.bettors_sorted();
        let handles = self.account_handles(&users)?;
        let mut accounts = self.lock_accounts(&users, &handles, timeout)?;

        let now = self.now();
        let market = ledger.market();
        let position: HashMap<UserId, usize> = users
            .iter()
            .enumerate()
            .map(|(i, u)| (u.clone(), i))
            .collect();
        let mut running: HashMap<UserId, Credits> = accounts
            .iter()
            .map(|a| (a.user_id().clone(), a.balance()))
            .collect();

        let mut entries: Vec<LedgerEntry> = Vec::with_capacity(ledger.wagers().len());
        let mut refunded = Vec::with_capacity(ledger.wagers().len());
        let mut total_refunded: Credits = 0;

        for wager in ledger.wagers().iter().filter(|w| w.settlement.is_pending()) {
            let account = &accounts[position[&wager.user_id]];
            let entry = account
                .draft_entry(
                    running[&wager.user_id],
                    EntryKind::BetRefund,
                    wager.amount,
                    Some(wager.id.to_string()),
                    format!("Refund: {} cancelled", market.title),
                    now,
                )
                .ok_or_else(|| LedgerError::InconsistentState {
                    market_id: market_id.clone(),
                    reason: format!("refund overflow for wager {}", wager.id),
                })?;
            running.insert(wager.user_id.clone(), entry.balance_after);
            total_refunded += wager.amount;
            entries.push(entry);

            let mut next = wager.clone();
            next.settlement = WagerSettlement::Refunded;
            refunded.push(next);
        }

        let mut next_market = market.clone();
        next_market.status = MarketStatus::Cancelled;
        next_market.resolved_at = Some(now);
        next_market.cancel_reason = Some(reason.to_string());

        let changes = Changeset {
            markets: vec![next_market.clone()],
            accounts: accounts.iter().map(|a| a.projected(&entries)).collect(),
            entries,
            wagers: refunded,
        };
        self.store.commit(&changes)?;

        ledger.absorb(next_market, &changes.wagers);
        for entry in changes.entries.iter().cloned() {
            accounts[position[&entry.user_id]].apply(entry);
        }
        drop(accounts);
        drop(ledger);

        let summary = SettlementSummary {
            market_id: market_id.clone(),
            credits_issued: changes.entries.len(),
            total_credited: total_refunded,
            settled_at: now,
        };
        info!(
            market_id = %market_id,
            refunds = summary.credits_issued,
            total_refunded,
            reason,
            "market cancelled"
        );

        self.events.publish(Event::MarketCancelled(MarketSettledEvent {
            market_id: market_id.clone(),
            winning_outcome_id: None,
            credits_issued: summary.credits_issued,
            total_credited: total_refunded,
            reason: Some(reason.to_string()),
            settled_at: now,
        }));

        Ok(Cancellation::Cancelled(summary))
    }
}

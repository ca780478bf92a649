//! Market resolution: pay every winning wager its locked-in payout.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::engine::Engine;
use crate::domain::{
    Changeset, Credits, EntryKind, LedgerEntry, MarketId, MarketStatus, OutcomeId, UserId,
    WagerSettlement,
};
use crate::error::{LedgerError, Result};
use crate::port::{BetResolvedEvent, Event, MarketSettledEvent};

/// Totals of one settlement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub market_id: MarketId,
    /// Payouts or refunds credited.
    pub credits_issued: usize,
    pub total_credited: Credits,
    pub settled_at: DateTime<Utc>,
}

/// Result of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Resolution {
    /// Winners were paid by this call.
    Resolved(SettlementSummary),
    /// The market was already resolved; nothing changed.
    AlreadyResolved,
}

impl Engine {
    /// Declare `winning_outcome_id` the winner and pay out.
    ///
    /// Every wager on the winner is credited its stored `potential_payout`;
    /// losing stakes stay debited. An open market is closed first. Resolving
    /// an already resolved market is a no-op.
    ///
    /// # Errors
    ///
    /// - `MarketNotFound`, `InvalidOutcome`
    /// - `AlreadyCancelled` for cancelled markets
    /// - `InconsistentState` if the market fails its audit (it is halted)
    /// - `AccountNotFound` if a bettor's account is missing
    /// - `Contention`, or a store error; nothing was changed
    pub fn resolve_market(
        &self,
        market_id: &MarketId,
        winning_outcome_id: &OutcomeId,
    ) -> Result<Resolution> {
        let timeout = self.settings.settlement_lock_timeout;
        let handle = self.market_handle(market_id)?;
        let mut ledger = self.lock_market(&handle, market_id, timeout)?;
        Self::ensure_not_halted(&ledger)?;

        match ledger.market().status {
            MarketStatus::Resolved => {
                info!(market_id = %market_id, "market already resolved, skipping");
                return Ok(Resolution::AlreadyResolved);
            }
            MarketStatus::Cancelled => {
                return Err(LedgerError::AlreadyCancelled(market_id.clone()).into())
            }
            MarketStatus::Open | MarketStatus::Closed => {}
        }

        let winner_index = ledger
            .market()
            .outcome_index(winning_outcome_id)
            .ok_or_else(|| LedgerError::InvalidOutcome {
                market_id: market_id.clone(),
                outcome_id: winning_outcome_id.clone(),
            })?;

        self.verify(&mut ledger)?;

        if ledger.market().status == MarketStatus::Open {
            debug!(market_id = %market_id, "closing open market before resolution");
        }

        let users = ledger.bettors_sorted();
        let handles = self.account_handles(&users)?;
        let mut accounts = self.lock_accounts(&users, &handles, timeout)?;

        let now = self.now();
        let market = ledger.market();
        let winning_pool = market.outcomes[winner_index].total_pool;

        let mut running: HashMap<UserId, Credits> = accounts
            .iter()
            .map(|a| (a.user_id().clone(), a.balance()))
            .collect();
        let position: HashMap<UserId, usize> = users
            .iter()
            .enumerate()
            .map(|(i, u)| (u.clone(), i))
            .collect();

        let mut entries: Vec<LedgerEntry> = Vec::new();
        let mut settled = Vec::with_capacity(ledger.wagers().len());
        let mut events = Vec::with_capacity(ledger.wagers().len() + 1);
        let mut total_credited: Credits = 0;

        for wager in ledger.wagers().iter().filter(|w| w.settlement.is_pending()) {
            let won = &wager.outcome_id == winning_outcome_id;
            let mut next = wager.clone();

            if won {
                let paid = wager.potential_payout;
                let account = &accounts[position[&wager.user_id]];
                let balance = running[&wager.user_id];
                let entry = account
                    .draft_entry(
                        balance,
                        EntryKind::BetWon,
                        paid,
                        Some(wager.id.to_string()),
                        format!("Won bet on {}", market.title),
                        now,
                    )
                    .ok_or_else(|| LedgerError::InconsistentState {
                        market_id: market_id.clone(),
                        reason: format!("payout overflow for wager {}", wager.id),
                    })?;
                running.insert(wager.user_id.clone(), entry.balance_after);
                entries.push(entry);
                total_credited += paid;
                next.settlement = WagerSettlement::Won { paid };
            } else {
                next.settlement = WagerSettlement::Lost;
            }

            let pool_percentage = if won && winning_pool > 0 {
                wager.amount as f64 / winning_pool as f64 * 100.0
            } else {
                0.0
            };
            events.push(Event::BetResolved(BetResolvedEvent {
                user_id: wager.user_id.clone(),
                market_id: market_id.clone(),
                wager_id: wager.id,
                won,
                amount: wager.amount,
                payout: if won { wager.potential_payout } else { 0 },
                was_all_in: wager.was_all_in(),
                hold_duration_days: wager.held_days(now),
                probability_at_purchase: wager.odds_at_purchase,
                pool_percentage,
            }));
            settled.push(next);
        }

        let mut next_market = market.clone();
        next_market.status = MarketStatus::Resolved;
        next_market.resolved_at = Some(now);
        for (i, outcome) in next_market.outcomes.iter_mut().enumerate() {
            outcome.is_winner = Some(i == winner_index);
        }

        let changed_rows = accounts
            .iter()
            .filter(|a| entries.iter().any(|e| &e.user_id == a.user_id()))
            .map(|a| a.projected(&entries))
            .collect();

        let changes = Changeset {
            markets: vec![next_market.clone()],
            accounts: changed_rows,
            entries,
            wagers: settled,
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
            total_credited,
            settled_at: now,
        };
        info!(
            market_id = %market_id,
            winner = %winning_outcome_id,
            payouts = summary.credits_issued,
            total_paid = total_credited,
            winning_pool,
            "market resolved"
        );

        events.push(Event::MarketResolved(MarketSettledEvent {
            market_id: market_id.clone(),
            winning_outcome_id: Some(winning_outcome_id.clone()),
            credits_issued: summary.credits_issued,
            total_credited,
            reason: None,
            settled_at: now,
        }));
        for event in events {
            self.events.publish(event);
        }

        Ok(Resolution::Resolved(summary))
    }
}

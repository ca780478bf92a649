//! Wager placement.

use serde::Serialize;
use tracing::{debug, info};

use super::engine::Engine;
use crate::domain::pricing::{self, OutcomeState};
use crate::domain::{
    Changeset, Credits, EntryKind, MarketId, MarketStatus, OutcomeId, PriceMove, UserId, Wager,
    WagerId, WagerSettlement,
};
use crate::error::{LedgerError, Result};
use crate::port::{BetPlacedEvent, Event};

/// Receipt for a placed wager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedWager {
    pub wager: Wager,
    /// Balance after the stake was debited.
    pub balance_after: Credits,
    /// How the wager moved the outcome's price.
    pub price: PriceMove,
}

impl PlacedWager {
    #[must_use]
    pub const fn wager_id(&self) -> WagerId {
        self.wager.id
    }

    #[must_use]
    pub const fn odds_at_purchase(&self) -> f64 {
        self.wager.odds_at_purchase
    }

    #[must_use]
    pub const fn potential_payout(&self) -> Credits {
        self.wager.potential_payout
    }
}

impl Engine {
    /// Place a wager of `amount` credits on `outcome_id`.
    ///
    /// The stake is debited, the outcome repriced and the wager recorded as
    /// one atomic unit. Odds are locked at the outcome's probability before
    /// this wager moved it.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` when `amount <= 0`
    /// - `MarketNotFound` / `AccountNotFound`
    /// - `MarketNotOpen` when the market is not open or past its deadline
    /// - `InvalidOutcome` when the outcome belongs to another market
    /// - `InsufficientBalance`
    /// - `InconsistentState` when the market is halted
    /// - `Contention` when a lock could not be taken in time
    /// - a store error if the commit failed; nothing was changed
    pub fn place_bet(
        &self,
        user_id: &UserId,
        market_id: &MarketId,
        outcome_id: &OutcomeId,
        amount: Credits,
    ) -> Result<PlacedWager> {
        if amount <= 0 {
            debug!(user_id = %user_id, amount, "non-positive wager rejected");
            return Err(LedgerError::InvalidAmount { amount }.into());
        }

        let market_handle = self.market_handle(market_id)?;
        let account_handle = self.account_handle(user_id)?;
        let timeout = self.settings.lock_timeout;

        let mut ledger = self.lock_market(&market_handle, market_id, timeout)?;
        Self::ensure_not_halted(&ledger)?;

        let now = self.now();
        let market = ledger.market();
        if market.status != MarketStatus::Open {
            debug!(market_id = %market_id, status = %market.status, "wager on non-open market");
            return Err(LedgerError::MarketNotOpen {
                market_id: market_id.clone(),
                reason: format!("market is {}", market.status),
            }
            .into());
        }
        if now >= market.closes_at {
            debug!(market_id = %market_id, closes_at = %market.closes_at, "wager after deadline");
            return Err(LedgerError::MarketNotOpen {
                market_id: market_id.clone(),
                reason: format!("betting closed at {}", market.closes_at),
            }
            .into());
        }
        let index = market
            .outcome_index(outcome_id)
            .ok_or_else(|| LedgerError::InvalidOutcome {
                market_id: market_id.clone(),
                outcome_id: outcome_id.clone(),
            })?;

        let mut account = self.lock_account(&account_handle, user_id, timeout)?;
        let balance_before = account.balance();
        if balance_before < amount {
            debug!(user_id = %user_id, balance_before, amount, "insufficient balance");
            return Err(LedgerError::InsufficientBalance {
                available: balance_before,
                requested: amount,
            }
            .into());
        }

        let odds_at_purchase = market.outcomes[index].current_probability;
        let states: Vec<OutcomeState> = market
            .outcomes
            .iter()
            .map(|o| OutcomeState {
                probability: o.current_probability,
                pool: o.total_pool,
            })
            .collect();
        let repricing = pricing::reprice(
            &states,
            index,
            amount,
            market.total_bets,
            market.unique_bettors,
            self.settings.drift,
        )
        .ok_or_else(|| LedgerError::InvalidOutcome {
            market_id: market_id.clone(),
            outcome_id: outcome_id.clone(),
        })?;

        let is_first_bettor_on_market = market.total_bets == 0;
        let is_new_bettor = !ledger.has_bettor(user_id);

        let mut next = market.clone();
        for (outcome, probability) in next.outcomes.iter_mut().zip(&repricing.probabilities) {
            outcome.current_probability = *probability;
        }
        next.outcomes[index].total_pool += amount;
        next.total_bets += 1;
        if is_new_bettor {
            next.unique_bettors += 1;
        }

        let wager = Wager {
            id: WagerId::generate(),
            user_id: user_id.clone(),
            market_id: market_id.clone(),
            outcome_id: outcome_id.clone(),
            amount,
            odds_at_purchase,
            potential_payout: pricing::potential_payout(amount, odds_at_purchase),
            balance_before,
            placed_at: now,
            settlement: WagerSettlement::Pending,
        };

        let entry = account
            .draft_entry(
                balance_before,
                EntryKind::BetPlaced,
                -amount,
                Some(wager.id.to_string()),
                format!("Bet on {} in {}", next.outcomes[index].label, next.title),
                now,
            )
            .ok_or(LedgerError::InsufficientBalance {
                available: balance_before,
                requested: amount,
            })?;

        let changes = Changeset {
            markets: vec![next.clone()],
            accounts: vec![account.projected([&entry])],
            entries: vec![entry.clone()],
            wagers: vec![wager.clone()],
        };
        self.store.commit(&changes)?;

        ledger.absorb(next, &changes.wagers);
        let balance_after = entry.balance_after;
        account.apply(entry);
        drop(account);
        drop(ledger);

        info!(
            user_id = %user_id,
            market_id = %market_id,
            outcome_id = %outcome_id,
            wager_id = %wager.id,
            amount,
            odds_at_purchase,
            new_probability = repricing.price.new_probability,
            "wager placed"
        );

        self.events.publish(Event::BetPlaced(BetPlacedEvent {
            user_id: user_id.clone(),
            market_id: market_id.clone(),
            outcome_id: outcome_id.clone(),
            wager_id: wager.id,
            amount,
            balance_before_bet: balance_before,
            is_first_bettor_on_market,
        }));

        Ok(PlacedWager {
            wager,
            balance_after,
            price: repricing.price,
        })
    }
}

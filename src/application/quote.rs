//! Read-only wager simulation.

use serde::Serialize;

use super::engine::Engine;
use crate::domain::pricing::{self, OutcomeState};
use crate::domain::{Credits, MarketId, OutcomeId, PriceMove};
use crate::error::{LedgerError, Result};

/// Probability of one outcome after a simulated wager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotedOutcome {
    pub outcome_id: OutcomeId,
    pub label: String,
    pub current_probability: f64,
    pub new_probability: f64,
}

/// What a wager would do if placed now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetQuote {
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub amount: Credits,
    /// Odds that would be locked in.
    pub current_probability: f64,
    pub potential_payout: Credits,
    pub price: PriceMove,
    /// Every outcome of the market, repriced.
    pub outcomes: Vec<QuotedOutcome>,
    /// Whether the market currently takes wagers.
    pub accepts_bets: bool,
}

impl Engine {
    /// Price a hypothetical wager against the live market without changing it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `MarketNotFound`, `InvalidOutcome` or
    /// `Contention`.
    pub fn quote(
        &self,
        market_id: &MarketId,
        outcome_id: &OutcomeId,
        amount: Credits,
    ) -> Result<BetQuote> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount }.into());
        }

        let handle = self.market_handle(market_id)?;
        let ledger = self.lock_market(&handle, market_id, self.settings.lock_timeout)?;
        let market = ledger.market();

        let invalid_outcome = || LedgerError::InvalidOutcome {
            market_id: market_id.clone(),
            outcome_id: outcome_id.clone(),
        };
        let index = market.outcome_index(outcome_id).ok_or_else(invalid_outcome)?;

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
        .ok_or_else(invalid_outcome)?;

        let current_probability = market.outcomes[index].current_probability;
        let outcomes = market
            .outcomes
            .iter()
            .zip(&repricing.probabilities)
            .map(|(o, p)| QuotedOutcome {
                outcome_id: o.id.clone(),
                label: o.label.clone(),
                current_probability: o.current_probability,
                new_probability: *p,
            })
            .collect();

        Ok(BetQuote {
            market_id: market_id.clone(),
            outcome_id: outcome_id.clone(),
            amount,
            current_probability,
            potential_payout: pricing::potential_payout(amount, current_probability),
            price: repricing.price,
            outcomes,
            accepts_bets: market.halted_reason.is_none() && market.accepts_bets_at(self.now()),
        })
    }
}

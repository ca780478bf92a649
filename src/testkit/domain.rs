//! Builders for domain primitives used across tests.

use chrono::{DateTime, Utc};

use crate::domain::{MarketId, NewMarket, NewOutcome, OutcomeId, UserId};

pub fn market_id(id: &str) -> MarketId {
    MarketId::new(id)
}

pub fn outcome_id(id: &str) -> OutcomeId {
    OutcomeId::new(id)
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

/// Outcome id `"{market}-{index}"`, the naming [`market_with`] uses.
pub fn nth_outcome(market: &str, index: usize) -> OutcomeId {
    OutcomeId::new(format!("{market}-{index}"))
}

/// A market with one outcome per probability, ids `"{id}-0"`, `"{id}-1"`, ...
///
/// # Panics
///
/// Panics if the probabilities are not a valid market definition.
pub fn market_with(id: &str, probabilities: &[f64], closes_at: DateTime<Utc>) -> NewMarket {
    let outcomes = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| NewOutcome::new(nth_outcome(id, i), format!("Outcome {i}"), *p))
        .collect();
    NewMarket::try_new(market_id(id), format!("Market {id}"), "", closes_at, outcomes)
        .expect("valid test market")
}

/// A two-outcome 50/50 market.
pub fn binary_market(id: &str, closes_at: DateTime<Utc>) -> NewMarket {
    market_with(id, &[0.5, 0.5], closes_at)
}

//! Per-market state container: the market, its wagers and bettor set.
//!
//! A [`MarketLedger`] is the unit of locking. Every mutation goes through
//! [`MarketLedger::absorb`] after the corresponding changeset was persisted.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::id::{MarketId, OutcomeId, UserId, WagerId};
use super::market::Market;
use super::wager::Wager;
use super::Credits;

/// Result of checking a market's aggregates against its wagers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub market_id: MarketId,
    pub wager_count: usize,
    pub recorded_total_bets: u64,
    pub distinct_bettors: usize,
    pub recorded_unique_bettors: u64,
    pub probability_sum: f64,
    /// Human-readable description of every broken invariant.
    pub violations: Vec<String>,
}

impl AuditReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A market together with every wager placed on it.
#[derive(Debug, Clone)]
pub struct MarketLedger {
    market: Market,
    wagers: Vec<Wager>,
    bettors: HashSet<UserId>,
}

impl MarketLedger {
    /// Ledger for a freshly created market.
    #[must_use]
    pub fn new(market: Market) -> Self {
        Self::from_parts(market, Vec::new())
    }

    /// Rebuild a ledger from persisted rows.
    #[must_use]
    pub fn from_parts(market: Market, wagers: Vec<Wager>) -> Self {
        let bettors = wagers.iter().map(|w| w.user_id.clone()).collect();
        Self {
            market,
            wagers,
            bettors,
        }
    }

    #[must_use]
    pub const fn market(&self) -> &Market {
        &self.market
    }

    /// Wagers in placement order.
    #[must_use]
    pub fn wagers(&self) -> &[Wager] {
        &self.wagers
    }

    /// Whether `user_id` already holds a wager on this market.
    #[must_use]
    pub fn has_bettor(&self, user_id: &UserId) -> bool {
        self.bettors.contains(user_id)
    }

    /// Distinct users with a wager on this market, sorted.
    #[must_use]
    pub fn bettors_sorted(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.bettors.iter().cloned().collect();
        users.sort();
        users
    }

    /// Replace the market row and upsert wagers from a persisted changeset.
    pub fn absorb(&mut self, market: Market, wagers: &[Wager]) {
        debug_assert_eq!(market.id, self.market.id);
        self.market = market;

        let positions: HashMap<WagerId, usize> = self
            .wagers
            .iter()
            .enumerate()
            .map(|(i, w)| (w.id, i))
            .collect();

        for wager in wagers.iter().filter(|w| w.market_id == self.market.id) {
            match positions.get(&wager.id) {
                Some(&i) => self.wagers[i] = wager.clone(),
                None => {
                    self.bettors.insert(wager.user_id.clone());
                    self.wagers.push(wager.clone());
                }
            }
        }
    }

    /// Mark the market halted in memory.
    pub fn halt(&mut self, reason: impl Into<String>) {
        self.market.halted_reason = Some(reason.into());
    }

    /// Check pool conservation and counters.
    #[must_use]
    pub fn audit(&self) -> AuditReport {
        let mut staked: HashMap<&OutcomeId, Credits> = HashMap::new();
        for wager in &self.wagers {
            *staked.entry(&wager.outcome_id).or_default() += wager.amount;
        }

        let mut violations = Vec::new();
        for outcome in &self.market.outcomes {
            let expected = staked.remove(&outcome.id).unwrap_or(0);
            if outcome.total_pool != expected {
                violations.push(format!(
                    "outcome {} pool is {} but its wagers sum to {}",
                    outcome.id, outcome.total_pool, expected
                ));
            }
        }
        for (outcome_id, amount) in staked {
            violations.push(format!(
                "{amount} credits staked on unknown outcome {outcome_id}"
            ));
        }

        if self.market.total_bets != self.wagers.len() as u64 {
            violations.push(format!(
                "total_bets is {} but {} wagers exist",
                self.market.total_bets,
                self.wagers.len()
            ));
        }
        if self.market.unique_bettors != self.bettors.len() as u64 {
            violations.push(format!(
                "unique_bettors is {} but {} distinct users bet",
                self.market.unique_bettors,
                self.bettors.len()
            ));
        }

        AuditReport {
            market_id: self.market.id.clone(),
            wager_count: self.wagers.len(),
            recorded_total_bets: self.market.total_bets,
            distinct_bettors: self.bettors.len(),
            recorded_unique_bettors: self.market.unique_bettors,
            probability_sum: self.market.probability_sum(),
            violations,
        }
    }
}

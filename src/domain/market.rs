//! Market-related domain types.
//!
//! - [`Market`] - A market with 2-10 mutually exclusive outcomes
//! - [`Outcome`] - One result of a market, with its live price and pool
//! - [`NewMarket`] - A validated market definition awaiting creation

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OutcomeId};
use super::pricing::{normalize_probabilities, probabilities_sum_to_one};
use super::Credits;

/// Fewest outcomes a market may offer.
pub const MIN_OUTCOMES: usize = 2;
/// Most outcomes a market may offer.
pub const MAX_OUTCOMES: usize = 10;

/// Lifecycle state of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Accepting wagers until the closing deadline.
    Open,
    /// No longer accepting wagers, awaiting settlement.
    Closed,
    /// A winning outcome was declared and paid.
    Resolved,
    /// Voided; every stake was refunded.
    Cancelled,
}

impl MarketStatus {
    /// Stable lowercase name used for persistence and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Resolved => "resolved",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "resolved" => Some(Self::Resolved),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Resolved and Cancelled are final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Cancelled)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outcome within a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: OutcomeId,
    pub label: String,
    pub initial_probability: f64,
    pub current_probability: f64,
    /// Sum of the amounts of every wager on this outcome.
    pub total_pool: Credits,
    /// `None` until resolution, then `Some(true)` for the winner only.
    pub is_winner: Option<bool>,
}

/// A prediction market and its per-outcome state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub title: String,
    pub description: String,
    pub status: MarketStatus,
    pub closes_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub total_bets: u64,
    pub unique_bettors: u64,
    pub cancel_reason: Option<String>,
    /// Set when an audit found the market inconsistent; blocks all mutation.
    pub halted_reason: Option<String>,
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// Open a market from a validated definition.
    ///
    /// Initial probabilities are normalized to sum to exactly 1.
    #[must_use]
    pub fn open(definition: NewMarket, created_at: DateTime<Utc>) -> Self {
        let initial: Vec<f64> = definition
            .outcomes
            .iter()
            .map(|o| o.initial_probability)
            .collect();
        let normalized = normalize_probabilities(&initial);

        let outcomes = definition
            .outcomes
            .into_iter()
            .zip(normalized)
            .map(|(o, p)| Outcome {
                id: o.id,
                label: o.label,
                initial_probability: p,
                current_probability: p,
                total_pool: 0,
                is_winner: None,
            })
            .collect();

        Self {
            id: definition.id,
            title: definition.title,
            description: definition.description,
            status: MarketStatus::Open,
            closes_at: definition.closes_at,
            created_at,
            resolved_at: None,
            total_bets: 0,
            unique_bettors: 0,
            cancel_reason: None,
            halted_reason: None,
            outcomes,
        }
    }

    /// Find an outcome by id.
    #[must_use]
    pub fn outcome(&self, id: &OutcomeId) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }

    /// Position of an outcome within the market.
    #[must_use]
    pub fn outcome_index(&self, id: &OutcomeId) -> Option<usize> {
        self.outcomes.iter().position(|o| &o.id == id)
    }

    /// Real credits across all outcomes.
    #[must_use]
    pub fn total_pool(&self) -> Credits {
        self.outcomes.iter().map(|o| o.total_pool).sum()
    }

    /// Sum of current outcome probabilities (drifts from 1 after clamping).
    #[must_use]
    pub fn probability_sum(&self) -> f64 {
        self.outcomes.iter().map(|o| o.current_probability).sum()
    }

    /// Whether the market takes wagers at `now`.
    #[must_use]
    pub fn accepts_bets_at(&self, now: DateTime<Utc>) -> bool {
        self.status == MarketStatus::Open && now < self.closes_at
    }

    /// The declared winner, if resolved.
    #[must_use]
    pub fn winner(&self) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.is_winner == Some(true))
    }
}

/// Definition of one outcome for market creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutcome {
    pub id: OutcomeId,
    pub label: String,
    pub initial_probability: f64,
}

impl NewOutcome {
    pub fn new(id: impl Into<OutcomeId>, label: impl Into<String>, initial_probability: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            initial_probability,
        }
    }
}

/// A market definition that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarket {
    id: MarketId,
    title: String,
    description: String,
    closes_at: DateTime<Utc>,
    outcomes: Vec<NewOutcome>,
}

impl NewMarket {
    /// Validate a market definition.
    ///
    /// # Domain Invariants
    ///
    /// - the title is not blank
    /// - 2 to 10 outcomes with distinct ids
    /// - every initial probability in `(0, 1)`
    /// - probabilities sum to 1 within 0.01
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if any invariant is violated.
    pub fn try_new(
        id: MarketId,
        title: impl Into<String>,
        description: impl Into<String>,
        closes_at: DateTime<Utc>,
        outcomes: Vec<NewOutcome>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::EmptyTitle);
        }

        if !(MIN_OUTCOMES..=MAX_OUTCOMES).contains(&outcomes.len()) {
            return Err(DomainError::OutcomeCount {
                count: outcomes.len(),
            });
        }

        let mut seen = HashSet::new();
        for outcome in &outcomes {
            if !seen.insert(&outcome.id) {
                return Err(DomainError::DuplicateOutcome {
                    outcome_id: outcome.id.to_string(),
                });
            }
            let p = outcome.initial_probability;
            if !(p > 0.0 && p < 1.0) {
                return Err(DomainError::ProbabilityOutOfRange {
                    outcome_id: outcome.id.to_string(),
                    probability: p,
                });
            }
        }

        let probabilities: Vec<f64> = outcomes.iter().map(|o| o.initial_probability).collect();
        if !probabilities_sum_to_one(&probabilities) {
            return Err(DomainError::ProbabilitySum {
                sum: probabilities.iter().sum(),
            });
        }

        Ok(Self {
            id,
            title,
            description: description.into(),
            closes_at,
            outcomes,
        })
    }

    /// The market id being created.
    #[must_use]
    pub const fn id(&self) -> &MarketId {
        &self.id
    }

    /// Outcome definitions in market order.
    #[must_use]
    pub fn outcomes(&self) -> &[NewOutcome] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn deadline() -> DateTime<Utc> {
        Utc::now() + Duration::days(3)
    }

    fn yes_no() -> Vec<NewOutcome> {
        vec![NewOutcome::new("yes", "Yes", 0.5), NewOutcome::new("no", "No", 0.5)]
    }

    #[test]
    fn try_new_accepts_binary_market() {
        let market = NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), yes_no());
        assert!(market.is_ok());
    }

    #[test]
    fn try_new_rejects_blank_title() {
        let result = NewMarket::try_new(MarketId::new("m"), "   ", "", deadline(), yes_no());
        assert_eq!(result, Err(DomainError::EmptyTitle));
    }

    #[test]
    fn try_new_rejects_too_many_outcomes() {
        let outcomes = (0..11)
            .map(|i| NewOutcome::new(format!("o{i}"), format!("Option {i}"), 1.0 / 11.0))
            .collect();
        let result = NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), outcomes);
        assert_eq!(result, Err(DomainError::OutcomeCount { count: 11 }));
    }

    #[test]
    fn try_new_rejects_duplicate_outcomes() {
        let outcomes = vec![NewOutcome::new("a", "A", 0.5), NewOutcome::new("a", "B", 0.5)];
        let result = NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), outcomes);
        assert!(matches!(result, Err(DomainError::DuplicateOutcome { .. })));
    }

    #[test]
    fn try_new_rejects_bad_probability_sum() {
        let outcomes = vec![NewOutcome::new("a", "A", 0.5), NewOutcome::new("b", "B", 0.3)];
        let result = NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), outcomes);
        assert!(matches!(result, Err(DomainError::ProbabilitySum { .. })));
    }

    #[test]
    fn try_new_rejects_degenerate_probability() {
        let outcomes = vec![NewOutcome::new("a", "A", 1.0), NewOutcome::new("b", "B", 0.0)];
        let result = NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), outcomes);
        assert!(matches!(result, Err(DomainError::ProbabilityOutOfRange { .. })));
    }

    #[test]
    fn open_normalizes_probabilities() {
        let outcomes = vec![
            NewOutcome::new("a", "A", 0.333),
            NewOutcome::new("b", "B", 0.333),
            NewOutcome::new("c", "C", 0.333),
        ];
        let definition =
            NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), outcomes).unwrap();
        let market = Market::open(definition, Utc::now());

        assert_eq!(market.status, MarketStatus::Open);
        assert!((market.probability_sum() - 1.0).abs() < 1e-12);
        assert!(market.outcomes.iter().all(|o| o.is_winner.is_none()));
        assert_eq!(market.total_pool(), 0);
    }

    #[test]
    fn accepts_bets_only_before_deadline() {
        let definition =
            NewMarket::try_new(MarketId::new("m"), "Title", "", deadline(), yes_no()).unwrap();
        let market = Market::open(definition, Utc::now());

        assert!(market.accepts_bets_at(Utc::now()));
        assert!(!market.accepts_bets_at(market.closes_at));
    }

    #[test]
    fn status_round_trips_through_name() {
        for status in [
            MarketStatus::Open,
            MarketStatus::Closed,
            MarketStatus::Resolved,
            MarketStatus::Cancelled,
        ] {
            assert_eq!(MarketStatus::parse(status.as_str()), Some(status));
        }
        assert!(MarketStatus::Cancelled.is_terminal());
        assert!(!MarketStatus::Closed.is_terminal());
    }
}

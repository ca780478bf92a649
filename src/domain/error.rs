//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors when a market
//! definition violates the engine's invariants.
//!
//! # Examples
//!
//! ```
//! use chrono::{Duration, Utc};
//! use wagerbook::domain::{DomainError, MarketId, NewMarket, NewOutcome};
//!
//! let result = NewMarket::try_new(
//!     MarketId::new("market-1"),
//!     "Will the library open on Sunday?",
//!     "",
//!     Utc::now() + Duration::days(7),
//!     vec![NewOutcome::new("yes", "Yes", 1.0)], // only one outcome
//! );
//!
//! assert!(matches!(result, Err(DomainError::OutcomeCount { count: 1 })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Markets offer between 2 and 10 outcomes.
    #[error("a market needs between 2 and 10 outcomes, got {count}")]
    OutcomeCount {
        /// The number of outcomes that was provided.
        count: usize,
    },

    /// Outcome identifiers must be unique within a market.
    #[error("duplicate outcome id: {outcome_id}")]
    DuplicateOutcome {
        /// The repeated identifier.
        outcome_id: String,
    },

    /// Initial probabilities must lie strictly between 0 and 1.
    #[error("initial probability for {outcome_id} must be in (0, 1), got {probability}")]
    ProbabilityOutOfRange {
        /// The outcome carrying the bad value.
        outcome_id: String,
        /// The invalid probability.
        probability: f64,
    },

    /// Initial probabilities must sum to one within tolerance.
    #[error("initial probabilities must sum to 1 (±0.01), got {sum}")]
    ProbabilitySum {
        /// The observed sum.
        sum: f64,
    },

    /// Markets need a title.
    #[error("market title cannot be empty")]
    EmptyTitle,
}

use thiserror::Error;

use crate::domain::{Credits, DomainError, MarketId, OutcomeId, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Ledger transaction errors.
///
/// Every variant except [`LedgerError::InconsistentState`] is raised before
/// any state is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("market not found: {0}")]
    MarketNotFound(MarketId),

    #[error("account not found: {0}")]
    AccountNotFound(UserId),

    #[error("account already exists: {0}")]
    AccountExists(UserId),

    #[error("market already exists: {0}")]
    MarketExists(MarketId),

    #[error("market {market_id} is not open: {reason}")]
    MarketNotOpen { market_id: MarketId, reason: String },

    #[error("outcome {outcome_id} does not belong to market {market_id}")]
    InvalidOutcome {
        market_id: MarketId,
        outcome_id: OutcomeId,
    },

    #[error("wager amount must be a positive integer, got {amount}")]
    InvalidAmount { amount: Credits },

    #[error("insufficient balance: {available} < {requested}")]
    InsufficientBalance {
        available: Credits,
        requested: Credits,
    },

    #[error("market {0} is already resolved")]
    AlreadyResolved(MarketId),

    #[error("market {0} is already cancelled")]
    AlreadyCancelled(MarketId),

    #[error("timed out waiting for {resource}")]
    Contention { resource: String },

    #[error("market {market_id} is halted: {reason}")]
    InconsistentState { market_id: MarketId, reason: String },

    #[error("monthly bonus already claimed this month by {0}")]
    BonusUnavailable(UserId),
}

impl LedgerError {
    /// Only lock contention is worth an automatic retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// The ledger error, if this is one.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_is_retryable() {
        let contention: Error = LedgerError::Contention {
            resource: "market m".into(),
        }
        .into();
        assert!(contention.is_retryable());

        let balance: Error = LedgerError::InsufficientBalance {
            available: 1,
            requested: 2,
        }
        .into();
        assert!(!balance.is_retryable());
        assert!(!Error::Database("locked".into()).is_retryable());
    }

    #[test]
    fn as_ledger_exposes_variant() {
        let err: Error = LedgerError::AlreadyResolved(MarketId::new("m")).into();
        assert_eq!(
            err.as_ledger(),
            Some(&LedgerError::AlreadyResolved(MarketId::new("m")))
        );
    }
}

//! Engine, account and event bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Credits, DriftPolicy};

/// Locking and pricing behaviour of the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Max wait for locks during wager placement.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Max wait for locks during resolution and cancellation.
    #[serde(default = "default_settlement_lock_timeout_ms")]
    pub settlement_lock_timeout_ms: u64,
    /// What to do when clamping leaves probabilities not summing to 1.
    #[serde(default)]
    pub probability_drift: DriftPolicy,
}

const fn default_lock_timeout_ms() -> u64 {
    250
}

const fn default_settlement_lock_timeout_ms() -> u64 {
    5_000
}

impl EngineConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    #[must_use]
    pub const fn settlement_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.settlement_lock_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            settlement_lock_timeout_ms: default_settlement_lock_timeout_ms(),
            probability_drift: DriftPolicy::default(),
        }
    }
}

/// Account funding rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Credits granted when an account is opened.
    #[serde(default = "default_signup_bonus")]
    pub signup_bonus: Credits,
    /// Credits granted by the once-a-month claim.
    #[serde(default = "default_monthly_bonus")]
    pub monthly_bonus: Credits,
}

const fn default_signup_bonus() -> Credits {
    1_000
}

const fn default_monthly_bonus() -> Credits {
    200
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            signup_bonus: default_signup_bonus(),
            monthly_bonus: default_monthly_bonus(),
        }
    }
}

/// Event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Warn when this many events are waiting for dispatch.
    #[serde(default = "default_backlog_warning")]
    pub backlog_warning: usize,
}

const fn default_backlog_warning() -> usize {
    10_000
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            backlog_warning: default_backlog_warning(),
        }
    }
}

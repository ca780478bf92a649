//! Wagers and their settlement state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId, UserId, WagerId};
use super::Credits;

/// A stake counts as all-in when it uses at least this share of the balance.
pub const ALL_IN_SHARE: f64 = 0.99;

/// How a wager was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WagerSettlement {
    /// Market still open or closed but not settled.
    Pending,
    /// Backed the winning outcome and was paid `paid`.
    Won { paid: Credits },
    /// Backed a losing outcome.
    Lost,
    /// Stake returned after the market was cancelled.
    Refunded,
}

impl WagerSettlement {
    /// Stable name used for persistence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won { .. } => "won",
            Self::Lost => "lost",
            Self::Refunded => "refunded",
        }
    }

    /// Returns true until the wager has been settled or refunded.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A user's stake on one outcome. Immutable after placement apart from
/// its settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub amount: Credits,
    /// Outcome probability just before this wager moved the price.
    pub odds_at_purchase: f64,
    pub potential_payout: Credits,
    /// Account balance immediately before the stake was debited.
    pub balance_before: Credits,
    pub placed_at: DateTime<Utc>,
    pub settlement: WagerSettlement,
}

impl Wager {
    /// Whether the stake used (nearly) the whole balance.
    #[must_use]
    pub fn was_all_in(&self) -> bool {
        self.balance_before > 0 && self.amount as f64 >= ALL_IN_SHARE * self.balance_before as f64
    }

    /// Whole days the wager was held before `settled_at`.
    #[must_use]
    pub fn held_days(&self, settled_at: DateTime<Utc>) -> i64 {
        (settled_at - self.placed_at).num_days().max(0)
    }
}

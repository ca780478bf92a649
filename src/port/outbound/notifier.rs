//! Notifier port for ledger events.
//!
//! Events leave the engine after a transaction committed. Delivery is
//! at-least-once, so every event carries a [`Event::dedup_key`] that
//! consumers use to stay idempotent.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Credits, MarketId, OutcomeId, UserId, WagerId};

/// Events emitted to external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A wager was placed.
    BetPlaced(BetPlacedEvent),
    /// One wager was settled by a resolution.
    BetResolved(BetResolvedEvent),
    /// A market was resolved and every winner paid.
    MarketResolved(MarketSettledEvent),
    /// A market was cancelled and every stake refunded.
    MarketCancelled(MarketSettledEvent),
    /// An external ranking job placed a user on the leaderboard.
    LeaderboardUpdate(LeaderboardEvent),
}

impl Event {
    /// Stable key identifying this event across redeliveries.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match self {
            Self::BetPlaced(e) => format!("bet_placed:{}", e.wager_id),
            Self::BetResolved(e) => format!("bet_resolved:{}", e.wager_id),
            Self::MarketResolved(e) => format!("market_resolved:{}", e.market_id),
            Self::MarketCancelled(e) => format!("market_cancelled:{}", e.market_id),
            Self::LeaderboardUpdate(e) => {
                format!("leaderboard:{}:{}:{}", e.user_id, e.rank, e.as_of.timestamp())
            }
        }
    }

    /// Short event name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BetPlaced(_) => "bet_placed",
            Self::BetResolved(_) => "bet_resolved",
            Self::MarketResolved(_) => "market_resolved",
            Self::MarketCancelled(_) => "market_cancelled",
            Self::LeaderboardUpdate(_) => "leaderboard_update",
        }
    }
}

/// Wager placement event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetPlacedEvent {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub wager_id: WagerId,
    pub amount: Credits,
    /// Balance before the stake was debited.
    pub balance_before_bet: Credits,
    /// True when the market had no wagers before this one.
    pub is_first_bettor_on_market: bool,
}

/// Settlement of a single wager at resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetResolvedEvent {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub wager_id: WagerId,
    pub won: bool,
    pub amount: Credits,
    /// Credits paid out, zero for losers.
    pub payout: Credits,
    pub was_all_in: bool,
    /// Whole days between placement and resolution.
    pub hold_duration_days: i64,
    pub probability_at_purchase: f64,
    /// Wager amount as a percentage of the winning pool, zero for losers.
    pub pool_percentage: f64,
}

/// Summary of a resolution or cancellation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSettledEvent {
    pub market_id: MarketId,
    /// Winning outcome for resolutions; `None` for cancellations.
    pub winning_outcome_id: Option<OutcomeId>,
    /// Payouts or refunds issued.
    pub credits_issued: usize,
    pub total_credited: Credits,
    /// Cancellation reason, if any.
    pub reason: Option<String>,
    pub settled_at: DateTime<Utc>,
}

/// Leaderboard rank change, driven outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEvent {
    pub user_id: UserId,
    pub rank: u32,
    pub as_of: DateTime<Utc>,
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the system.
/// Notifications are fire-and-forget.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
/// - Events may be redelivered; use [`Event::dedup_key`] to ignore repeats
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, event: Event) {
        (**self).notify(event);
    }
}

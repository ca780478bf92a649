//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for logging and fan-out. The badge
//! consumer lives in [`crate::adapter::outbound::badge`].

use tracing::info;

use crate::port::{Event, Notifier};

/// Registry of notifiers.
///
/// The registry is itself a [`Notifier`], so the engine's event drain can
/// be pointed at one value that fans out to every consumer.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifierRegistry {
    fn notify(&self, event: Event) {
        self.notify_all(event);
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::BetPlaced(e) => {
                info!(
                    user_id = %e.user_id,
                    market_id = %e.market_id,
                    outcome_id = %e.outcome_id,
                    amount = e.amount,
                    first = e.is_first_bettor_on_market,
                    "Bet placed"
                );
            }
            Event::BetResolved(e) => {
                info!(
                    user_id = %e.user_id,
                    market_id = %e.market_id,
                    won = e.won,
                    payout = e.payout,
                    "Bet resolved"
                );
            }
            Event::MarketResolved(e) => {
                info!(
                    market_id = %e.market_id,
                    winner = ?e.winning_outcome_id.as_ref().map(ToString::to_string),
                    credited = e.total_credited,
                    payouts = e.credits_issued,
                    "Market resolved"
                );
            }
            Event::MarketCancelled(e) => {
                info!(
                    market_id = %e.market_id,
                    reason = e.reason.as_deref().unwrap_or(""),
                    refunded = e.total_credited,
                    "Market cancelled"
                );
            }
            Event::LeaderboardUpdate(e) => {
                info!(user_id = %e.user_id, rank = e.rank, "Leaderboard updated");
            }
        }
    }
}

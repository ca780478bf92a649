//! Badge consumer.
//!
//! Tracks per-user betting statistics from ledger events and awards badges
//! whose condition holds. Each rule's condition is one variant of
//! [`BadgeCondition`], evaluated by a single match arm.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Credits, UserId};
use crate::port::{BetPlacedEvent, BetResolvedEvent, Event, LeaderboardEvent, Notifier};

/// Condition under which a badge is earned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCondition {
    /// Consecutive winning wagers reach `threshold`.
    WinStreak { threshold: u32 },
    /// Consecutive losing wagers reach `threshold`.
    LoseStreak { threshold: u32 },
    /// Lifetime wagers reach `threshold`.
    TotalBets { threshold: u64 },
    /// Won a wager that staked (nearly) the whole balance.
    AllInWin,
    /// Lost a wager that staked (nearly) the whole balance.
    AllInLose,
    /// Leaderboard rank at or above `threshold` (1 is best).
    LeaderboardRank { threshold: u32 },
    /// Won a wager held for at least `threshold` days.
    HoldDurationWin { threshold: i64 },
    /// Won a wager bought below `threshold` percent probability.
    LowProbabilityWin { threshold: f64 },
    /// Won while holding less than `threshold` percent of the winning pool.
    MinorityWin { threshold: f64 },
    /// Placed a single wager of at least `threshold` credits.
    SingleBetAmount { threshold: Credits },
    /// Opened at least `threshold` markets as their first bettor.
    FirstBettorCount { threshold: u32 },
}

/// A badge definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRule {
    pub id: String,
    pub name: String,
    pub condition: BadgeCondition,
}

impl BadgeRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, condition: BadgeCondition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition,
        }
    }
}

/// Built-in badge catalog.
#[must_use]
pub fn standard_rules() -> Vec<BadgeRule> {
    use BadgeCondition as C;
    vec![
        BadgeRule::new("hot-streak", "Hot Streak", C::WinStreak { threshold: 3 }),
        BadgeRule::new("cold-streak", "Cold Streak", C::LoseStreak { threshold: 5 }),
        BadgeRule::new("regular", "Regular", C::TotalBets { threshold: 10 }),
        BadgeRule::new("all-in-hero", "All-In Hero", C::AllInWin),
        BadgeRule::new("all-in-zero", "All-In Zero", C::AllInLose),
        BadgeRule::new("top-dog", "Top Dog", C::LeaderboardRank { threshold: 1 }),
        BadgeRule::new("diamond-hands", "Diamond Hands", C::HoldDurationWin { threshold: 7 }),
        BadgeRule::new("long-shot", "Long Shot", C::LowProbabilityWin { threshold: 20.0 }),
        BadgeRule::new("contrarian", "Contrarian", C::MinorityWin { threshold: 10.0 }),
        BadgeRule::new("high-roller", "High Roller", C::SingleBetAmount { threshold: 500 }),
        BadgeRule::new("trailblazer", "Trailblazer", C::FirstBettorCount { threshold: 3 }),
    ]
}

/// Running statistics for one bettor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BettorStats {
    pub total_bets: u64,
    pub win_streak: u32,
    pub lose_streak: u32,
    pub best_win_streak: u32,
    pub wins: u64,
    pub losses: u64,
    pub first_bettor_count: u32,
    pub largest_bet: Credits,
    pub best_rank: Option<u32>,
}

impl BettorStats {
    fn record_placed(&mut self, event: &BetPlacedEvent) {
        self.total_bets += 1;
        self.largest_bet = self.largest_bet.max(event.amount);
        if event.is_first_bettor_on_market {
            self.first_bettor_count += 1;
        }
    }

    fn record_resolved(&mut self, event: &BetResolvedEvent) {
        if event.won {
            self.wins += 1;
            self.win_streak += 1;
            self.lose_streak = 0;
            self.best_win_streak = self.best_win_streak.max(self.win_streak);
        } else {
            self.losses += 1;
            self.lose_streak += 1;
            self.win_streak = 0;
        }
    }

    fn record_rank(&mut self, event: &LeaderboardEvent) {
        self.best_rank = Some(self.best_rank.map_or(event.rank, |r| r.min(event.rank)));
    }
}

/// The event being evaluated, with the user's stats already updated.
enum Trigger<'a> {
    Placed(&'a BetPlacedEvent),
    Resolved(&'a BetResolvedEvent),
    Ranked(&'a LeaderboardEvent),
}

impl BadgeCondition {
    fn holds(&self, stats: &BettorStats, trigger: &Trigger<'_>) -> bool {
        match (*self, trigger) {
            (Self::WinStreak { threshold }, Trigger::Resolved(e)) => {
                e.won && stats.win_streak >= threshold
            }
            (Self::LoseStreak { threshold }, Trigger::Resolved(e)) => {
                !e.won && stats.lose_streak >= threshold
            }
            (Self::TotalBets { threshold }, Trigger::Placed(_)) => stats.total_bets >= threshold,
            (Self::AllInWin, Trigger::Resolved(e)) => e.won && e.was_all_in,
            (Self::AllInLose, Trigger::Resolved(e)) => !e.won && e.was_all_in,
            (Self::LeaderboardRank { threshold }, Trigger::Ranked(e)) => {
                e.rank >= 1 && e.rank <= threshold
            }
            (Self::HoldDurationWin { threshold }, Trigger::Resolved(e)) => {
                e.won && e.hold_duration_days >= threshold
            }
            (Self::LowProbabilityWin { threshold }, Trigger::Resolved(e)) => {
                e.won && e.probability_at_purchase * 100.0 < threshold
            }
            (Self::MinorityWin { threshold }, Trigger::Resolved(e)) => {
                e.won && e.pool_percentage < threshold
            }
            (Self::SingleBetAmount { threshold }, Trigger::Placed(e)) => e.amount >= threshold,
            (Self::FirstBettorCount { threshold }, Trigger::Placed(_)) => {
                stats.first_bettor_count >= threshold
            }
            _ => false,
        }
    }
}

/// A badge granted to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeAward {
    pub user_id: UserId,
    pub badge_id: String,
    pub badge_name: String,
    pub awarded_at: DateTime<Utc>,
    /// Key of the event that triggered the award.
    pub trigger: String,
}

/// Default number of recent event keys remembered for deduplication.
pub const DEFAULT_DEDUP_WINDOW: usize = 100_000;

/// Most recent event keys, oldest evicted first.
#[derive(Default)]
struct SeenWindow {
    keys: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenWindow {
    /// Record `key`; false if it is already in the window.
    fn insert(&mut self, key: &str, capacity: usize) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        while self.order.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.keys.remove(&oldest);
                }
                None => break,
            }
        }
        self.keys.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

#[derive(Default)]
struct TrackerState {
    seen: SeenWindow,
    stats: HashMap<UserId, BettorStats>,
    awards: BTreeMap<UserId, Vec<BadgeAward>>,
}

/// Badge consumer fed from the event bus.
///
/// Redelivered events are ignored by [`Event::dedup_key`] as long as the
/// original is among the last `dedup_window` keys seen; a badge is awarded
/// to a user at most once.
pub struct BadgeTracker {
    rules: Vec<BadgeRule>,
    dedup_window: usize,
    state: Mutex<TrackerState>,
}

impl BadgeTracker {
    #[must_use]
    pub fn new(rules: Vec<BadgeRule>) -> Self {
        Self {
            rules,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Remember at most `window` event keys (minimum 1).
    #[must_use]
    pub fn with_dedup_window(mut self, window: usize) -> Self {
        self.dedup_window = window.max(1);
        self
    }

    /// Number of event keys currently remembered.
    #[must_use]
    pub fn dedup_len(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// Tracker using [`standard_rules`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(standard_rules())
    }

    #[must_use]
    pub fn rules(&self) -> &[BadgeRule] {
        &self.rules
    }

    /// Statistics gathered for `user_id` so far.
    #[must_use]
    pub fn stats(&self, user_id: &UserId) -> Option<BettorStats> {
        self.state.lock().stats.get(user_id).cloned()
    }

    /// Badges awarded to `user_id`, in award order.
    #[must_use]
    pub fn awards(&self, user_id: &UserId) -> Vec<BadgeAward> {
        self.state.lock().awards.get(user_id).cloned().unwrap_or_default()
    }

    /// Every award, grouped by user.
    #[must_use]
    pub fn all_awards(&self) -> BTreeMap<UserId, Vec<BadgeAward>> {
        self.state.lock().awards.clone()
    }

    fn evaluate(&self, state: &mut TrackerState, user_id: &UserId, trigger: &Trigger<'_>, key: &str) {
        let TrackerState { stats, awards, .. } = state;
        let stats = stats.entry(user_id.clone()).or_default();
        match trigger {
            Trigger::Placed(e) => stats.record_placed(e),
            Trigger::Resolved(e) => stats.record_resolved(e),
            Trigger::Ranked(e) => stats.record_rank(e),
        }

        let earned = awards.entry(user_id.clone()).or_default();
        for rule in &self.rules {
            if earned.iter().any(|a| a.badge_id == rule.id) {
                continue;
            }
            if !rule.condition.holds(stats, trigger) {
                continue;
            }
            info!(user_id = %user_id, badge = %rule.id, "badge awarded");
            earned.push(BadgeAward {
                user_id: user_id.clone(),
                badge_id: rule.id.clone(),
                badge_name: rule.name.clone(),
                awarded_at: Utc::now(),
                trigger: key.to_string(),
            });
        }
        if earned.is_empty() {
            awards.remove(user_id);
        }
    }
}

impl Notifier for BadgeTracker {
    fn notify(&self, event: Event) {
        let key = event.dedup_key();
        let mut state = self.state.lock();
        if !state.seen.insert(&key, self.dedup_window) {
            debug!(key = %key, "duplicate event ignored");
            return;
        }
        match &event {
            Event::BetPlaced(e) => self.evaluate(&mut state, &e.user_id, &Trigger::Placed(e), &key),
            Event::BetResolved(e) => {
                self.evaluate(&mut state, &e.user_id, &Trigger::Resolved(e), &key);
            }
            Event::LeaderboardUpdate(e) => {
                self.evaluate(&mut state, &e.user_id, &Trigger::Ranked(e), &key);
            }
            Event::MarketResolved(_) | Event::MarketCancelled(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, OutcomeId, WagerId};

    fn placed(user: &str, amount: Credits, first: bool) -> Event {
        Event::BetPlaced(BetPlacedEvent {
            user_id: UserId::from(user),
            market_id: MarketId::new("m"),
            outcome_id: OutcomeId::from("yes"),
            wager_id: WagerId::generate(),
            amount,
            balance_before_bet: 1000,
            is_first_bettor_on_market: first,
        })
    }

    fn resolved(user: &str, won: bool) -> BetResolvedEvent {
        BetResolvedEvent {
            user_id: UserId::from(user),
            market_id: MarketId::new("m"),
            wager_id: WagerId::generate(),
            won,
            amount: 100,
            payout: if won { 200 } else { 0 },
            was_all_in: false,
            hold_duration_days: 0,
            probability_at_purchase: 0.5,
            pool_percentage: if won { 50.0 } else { 0.0 },
        }
    }

    fn badge_ids(tracker: &BadgeTracker, user: &str) -> Vec<String> {
        tracker
            .awards(&UserId::from(user))
            .into_iter()
            .map(|a| a.badge_id)
            .collect()
    }

    #[test]
    fn win_streak_resets_on_loss() {
        let tracker = BadgeTracker::new(vec![BadgeRule::new(
            "streak",
            "Streak",
            BadgeCondition::WinStreak { threshold: 2 },
        )]);

        tracker.notify(Event::BetResolved(resolved("alice", true)));
        tracker.notify(Event::BetResolved(resolved("alice", false)));
        tracker.notify(Event::BetResolved(resolved("alice", true)));
        assert!(badge_ids(&tracker, "alice").is_empty());

        tracker.notify(Event::BetResolved(resolved("alice", true)));
        assert_eq!(badge_ids(&tracker, "alice"), vec!["streak"]);
    }

    #[test]
    fn redelivered_event_is_counted_once() {
        let tracker = BadgeTracker::new(vec![BadgeRule::new(
            "two",
            "Two",
            BadgeCondition::TotalBets { threshold: 2 },
        )]);

        let event = placed("bob", 10, false);
        tracker.notify(event.clone());
        tracker.notify(event);

        assert_eq!(tracker.stats(&UserId::from("bob")).unwrap().total_bets, 1);
        assert!(badge_ids(&tracker, "bob").is_empty());
    }

    #[test]
    fn badge_awarded_once() {
        let tracker = BadgeTracker::new(vec![BadgeRule::new(
            "big",
            "Big",
            BadgeCondition::SingleBetAmount { threshold: 500 },
        )]);

        tracker.notify(placed("carol", 600, false));
        tracker.notify(placed("carol", 700, false));

        assert_eq!(badge_ids(&tracker, "carol"), vec!["big"]);
    }

    #[test]
    fn resolution_conditions_need_a_win() {
        let tracker = BadgeTracker::standard();
        let mut lost = resolved("dave", false);
        lost.was_all_in = true;
        lost.probability_at_purchase = 0.05;
        tracker.notify(Event::BetResolved(lost));

        assert_eq!(badge_ids(&tracker, "dave"), vec!["all-in-zero"]);

        let mut won = resolved("dave", true);
        won.probability_at_purchase = 0.1;
        won.pool_percentage = 5.0;
        won.hold_duration_days = 8;
        tracker.notify(Event::BetResolved(won));

        let ids = badge_ids(&tracker, "dave");
        assert!(ids.contains(&"long-shot".to_string()));
        assert!(ids.contains(&"contrarian".to_string()));
        assert!(ids.contains(&"diamond-hands".to_string()));
    }

    #[test]
    fn leaderboard_and_first_bettor() {
        let tracker = BadgeTracker::standard();
        tracker.notify(Event::LeaderboardUpdate(LeaderboardEvent {
            user_id: UserId::from("erin"),
            rank: 2,
            as_of: Utc::now(),
        }));
        assert!(badge_ids(&tracker, "erin").is_empty());

        tracker.notify(Event::LeaderboardUpdate(LeaderboardEvent {
            user_id: UserId::from("erin"),
            rank: 1,
            as_of: Utc::now(),
        }));
        assert_eq!(badge_ids(&tracker, "erin"), vec!["top-dog"]);

        for _ in 0..3 {
            tracker.notify(placed("erin", 10, true));
        }
        assert!(badge_ids(&tracker, "erin").contains(&"trailblazer".to_string()));
    }

    #[test]
    fn conditions_deserialize_from_tagged_toml() {
        let rule: BadgeRule = toml::from_str(
            r#"
            id = "hot"
            name = "Hot"
            condition = { type = "win_streak", threshold = 4 }
            "#,
        )
        .unwrap();
        assert_eq!(rule.condition, BadgeCondition::WinStreak { threshold: 4 });
    }

    #[test]
    fn dedup_window_stays_bounded() {
        let tracker = BadgeTracker::standard().with_dedup_window(2);
        let first = placed("alice", 10, false);
        let second = placed("alice", 10, false);

        tracker.notify(first.clone());
        tracker.notify(second.clone());
        tracker.notify(first.clone());
        tracker.notify(second);
        assert_eq!(tracker.stats(&UserId::from("alice")).unwrap().total_bets, 2);

        for _ in 0..10 {
            tracker.notify(placed("alice", 10, false));
        }
        assert_eq!(tracker.dedup_len(), 2);
        assert_eq!(tracker.stats(&UserId::from("alice")).unwrap().total_bets, 12);

        // Evicted long ago, so counted again.
        tracker.notify(first);
        assert_eq!(tracker.stats(&UserId::from("alice")).unwrap().total_bets, 13);
    }
}

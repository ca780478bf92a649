mod support;

use std::sync::Arc;

use chrono::Duration;
use support::recording::RecordingNotifier;
use wagerbook::adapter::outbound::badge::BadgeTracker;
use wagerbook::adapter::outbound::notifier::NotifierRegistry;
use wagerbook::port::Notifier;
use wagerbook::testkit::domain::{market_id, nth_outcome};
use wagerbook::testkit::engine::TestEngine;

fn badge_ids(tracker: &BadgeTracker, user: &wagerbook::domain::UserId) -> Vec<String> {
    tracker.awards(user).into_iter().map(|a| a.badge_id).collect()
}

#[test]
fn long_held_all_in_upset_earns_badges() {
    let mut t = TestEngine::new();
    let users = t.accounts(&["alice", "bob"]);
    let (alice, bob) = (&users[0], &users[1]);
    t.market("upset", &[0.15, 0.85]);
    let m = market_id("upset");

    t.engine.place_bet(alice, &m, &nth_outcome("upset", 0), 1000).unwrap();
    t.engine.place_bet(bob, &m, &nth_outcome("upset", 1), 200).unwrap();
    t.clock.advance(Duration::days(8));
    t.engine.resolve_market(&m, &nth_outcome("upset", 0)).unwrap();
    t.engine.report_leaderboard_rank(alice, 1).unwrap();

    let tracker = Arc::new(BadgeTracker::standard());
    let recorder = RecordingNotifier::new();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(Arc::clone(&tracker)));
    registry.register(Box::new(recorder.clone()));
    let delivered = t.events.drain(&registry);

    assert_eq!(delivered, recorder.len());
    assert_eq!(
        recorder.names(),
        vec![
            "bet_placed",
            "bet_placed",
            "bet_resolved",
            "bet_resolved",
            "market_resolved",
            "leaderboard_update"
        ]
    );

    let mut earned = badge_ids(&tracker, alice);
    earned.sort();
    assert_eq!(
        earned,
        vec!["all-in-hero", "diamond-hands", "high-roller", "long-shot", "top-dog"]
    );
    assert!(badge_ids(&tracker, bob).is_empty());

    let stats = tracker.stats(alice).unwrap();
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.first_bettor_count, 1);
    assert_eq!(stats.best_rank, Some(1));
    assert_eq!(tracker.stats(bob).unwrap().lose_streak, 1);
    assert!(t.take_events().is_empty());
}

#[test]
fn first_bettor_on_three_markets_is_a_trailblazer() {
    let mut t = TestEngine::new();
    let users = t.accounts(&["carol", "dave"]);
    for id in ["a", "b", "c"] {
        t.market(id, &[0.5, 0.5]);
        t.engine
            .place_bet(&users[0], &market_id(id), &nth_outcome(id, 0), 10)
            .unwrap();
        t.engine
            .place_bet(&users[1], &market_id(id), &nth_outcome(id, 1), 10)
            .unwrap();
    }

    let tracker = BadgeTracker::standard();
    for event in t.take_events() {
        tracker.notify(event);
    }

    assert_eq!(badge_ids(&tracker, &users[0]), vec!["trailblazer"]);
    assert!(badge_ids(&tracker, &users[1]).is_empty());
    assert_eq!(tracker.stats(&users[1]).unwrap().total_bets, 3);
}

#[tokio::test]
async fn spawned_dispatcher_delivers_everything_then_stops() {
    let t = TestEngine::new();
    let users = t.accounts(&["erin"]);
    t.market("m", &[0.5, 0.5]);
    for _ in 0..10 {
        t.engine
            .place_bet(&users[0], &market_id("m"), &nth_outcome("m", 0), 1)
            .unwrap();
    }
    assert_eq!(t.engine.events().backlog(), 10);

    let tracker = Arc::new(BadgeTracker::standard());
    let TestEngine { engine, events, .. } = t;
    let dispatcher = events.spawn(tracker.clone());
    drop(engine);

    assert_eq!(dispatcher.await.unwrap(), 10);
    assert_eq!(badge_ids(&tracker, &users[0]), vec!["regular"]);
}

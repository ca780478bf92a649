mod support;

use std::sync::Arc;

use chrono::Duration;
use support::assertions::total_balance;
use wagerbook::adapter::outbound::memory::MemoryStore;
use wagerbook::application::{event, Cancellation, Engine, EngineSettings, Resolution};
use wagerbook::domain::{EntryKind, MarketStatus, WagerSettlement};
use wagerbook::error::LedgerError;
use wagerbook::port::{Event, LedgerStore};
use wagerbook::testkit::domain::{market_id, nth_outcome};
use wagerbook::testkit::engine::TestEngine;

/// Alice backs outcome 0, bob backs outcome 1, carol backs outcome 0 twice.
fn seeded_book() -> (TestEngine, Vec<wagerbook::domain::UserId>) {
    let t = TestEngine::new();
    let users = t.accounts(&["alice", "bob", "carol"]);
    t.market("m", &[0.5, 0.5]);
    let m = market_id("m");
    t.engine.place_bet(&users[0], &m, &nth_outcome("m", 0), 100).unwrap();
    t.engine.place_bet(&users[1], &m, &nth_outcome("m", 1), 200).unwrap();
    t.engine.place_bet(&users[2], &m, &nth_outcome("m", 0), 50).unwrap();
    t.engine.place_bet(&users[2], &m, &nth_outcome("m", 0), 50).unwrap();
    (t, users)
}

#[test]
fn resolution_pays_locked_payouts_to_winners_only() {
    let (mut t, users) = seeded_book();
    let m = market_id("m");
    let wagers = t.engine.wagers(&m).unwrap();
    let expected_paid: i64 = wagers
        .iter()
        .filter(|w| w.outcome_id == nth_outcome("m", 0))
        .map(|w| w.potential_payout)
        .sum();
    t.take_events();

    let summary = match t.engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap() {
        Resolution::Resolved(summary) => summary,
        Resolution::AlreadyResolved => panic!("first resolve must settle"),
    };
    assert_eq!(summary.credits_issued, 3);
    assert_eq!(summary.total_credited, expected_paid);

    assert_eq!(t.engine.balance(&users[0]).unwrap(), 900 + 200);
    assert_eq!(t.engine.balance(&users[1]).unwrap(), 800);
    let carol_paid: i64 = wagers
        .iter()
        .filter(|w| w.user_id == users[2])
        .map(|w| w.potential_payout)
        .sum();
    assert_eq!(t.engine.balance(&users[2]).unwrap(), 900 + carol_paid);

    let market = t.engine.market(&m).unwrap();
    assert_eq!(market.status, MarketStatus::Resolved);
    assert!(market.resolved_at.is_some());
    assert_eq!(market.outcomes[0].is_winner, Some(true));
    assert_eq!(market.outcomes[1].is_winner, Some(false));

    for wager in t.engine.wagers(&m).unwrap() {
        match wager.settlement {
            WagerSettlement::Won { paid } => assert_eq!(paid, wager.potential_payout),
            WagerSettlement::Lost => assert_eq!(wager.user_id, users[1]),
            other => panic!("unexpected settlement {other:?}"),
        }
    }

    let events = t.take_events();
    let resolved: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::BetResolved(e) => Some(e),
            _ => None,
        })
        .collect();
    assert_eq!(resolved.len(), 4);
    let alice = resolved.iter().find(|e| e.user_id == users[0]).unwrap();
    assert!(alice.won);
    assert_eq!(alice.payout, 200);
    assert_eq!(alice.pool_percentage, 50.0);
    assert_eq!(alice.probability_at_purchase, 0.5);
    let bob = resolved.iter().find(|e| e.user_id == users[1]).unwrap();
    assert!(!bob.won);
    assert_eq!(bob.pool_percentage, 0.0);
    assert!(matches!(events.last(), Some(Event::MarketResolved(e)) if e.total_credited == expected_paid));
}

#[test]
fn resolving_twice_is_a_no_op() {
    let (mut t, users) = seeded_book();
    let m = market_id("m");
    t.engine.resolve_market(&m, &nth_outcome("m", 1)).unwrap();
    let balances: Vec<i64> = users.iter().map(|u| t.engine.balance(u).unwrap()).collect();
    let commits = t.store.commits().len();
    t.take_events();

    assert_eq!(
        t.engine.resolve_market(&m, &nth_outcome("m", 1)).unwrap(),
        Resolution::AlreadyResolved
    );
    assert_eq!(
        t.engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap(),
        Resolution::AlreadyResolved
    );

    let after: Vec<i64> = users.iter().map(|u| t.engine.balance(u).unwrap()).collect();
    assert_eq!(after, balances);
    assert_eq!(t.store.commits().len(), commits);
    assert!(t.take_events().is_empty());

    let err = t.engine.cancel_market(&m, "too late").unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::AlreadyResolved(m.clone())));
}

#[test]
fn resolving_with_foreign_outcome_is_rejected() {
    let (t, _users) = seeded_book();
    t.market("other", &[0.5, 0.5]);

    let err = t
        .engine
        .resolve_market(&market_id("m"), &nth_outcome("other", 0))
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::InvalidOutcome { .. })));
    assert_eq!(t.engine.market(&market_id("m")).unwrap().status, MarketStatus::Open);
}

#[test]
fn cancellation_refunds_every_stake() {
    let (mut t, users) = seeded_book();
    let m = market_id("m");
    t.take_events();

    let summary = match t.engine.cancel_market(&m, "question was ambiguous").unwrap() {
        Cancellation::Cancelled(summary) => summary,
        Cancellation::AlreadyCancelled => panic!("first cancel must refund"),
    };
    assert_eq!(summary.credits_issued, 4);
    assert_eq!(summary.total_credited, 400);

    for user in &users {
        assert_eq!(t.engine.balance(user).unwrap(), 1000);
        let last = t.engine.ledger_entries(user).unwrap().pop().unwrap();
        assert_eq!(last.kind, EntryKind::BetRefund);
    }

    let market = t.engine.market(&m).unwrap();
    assert_eq!(market.status, MarketStatus::Cancelled);
    assert_eq!(market.cancel_reason.as_deref(), Some("question was ambiguous"));
    assert!(t
        .engine
        .wagers(&m)
        .unwrap()
        .iter()
        .all(|w| w.settlement == WagerSettlement::Refunded));

    let events = t.take_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::MarketCancelled(e) if e.reason.is_some()));

    assert_eq!(
        t.engine.cancel_market(&m, "again").unwrap(),
        Cancellation::AlreadyCancelled
    );
    let err = t.engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap_err();
    assert_eq!(err.as_ledger(), Some(&LedgerError::AlreadyCancelled(m)));
}

#[test]
fn failed_settlement_commit_leaves_everything_pending() {
    let (mut t, users) = seeded_book();
    let m = market_id("m");
    let before = total_balance(&t.engine, &users);
    t.take_events();

    t.store.fail_next_commit();
    assert!(t.engine.resolve_market(&m, &nth_outcome("m", 0)).is_err());

    assert_eq!(total_balance(&t.engine, &users), before);
    assert_eq!(t.engine.market(&m).unwrap().status, MarketStatus::Open);
    assert!(t
        .engine
        .wagers(&m)
        .unwrap()
        .iter()
        .all(|w| w.settlement.is_pending()));
    assert!(t.take_events().is_empty());

    assert!(matches!(
        t.engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap(),
        Resolution::Resolved(_)
    ));
}

#[test]
fn hold_duration_and_all_in_are_reported() {
    let mut t = TestEngine::new();
    let users = t.accounts(&["alice"]);
    t.market("m", &[0.5, 0.5]);
    let m = market_id("m");
    t.engine.place_bet(&users[0], &m, &nth_outcome("m", 0), 1000).unwrap();

    t.clock.advance(Duration::days(3) + Duration::hours(5));
    t.engine.close_market(&m).unwrap();
    t.engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap();

    let resolved = t
        .take_events()
        .into_iter()
        .find_map(|e| match e {
            Event::BetResolved(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert!(resolved.was_all_in);
    assert_eq!(resolved.hold_duration_days, 3);
    assert_eq!(resolved.pool_percentage, 100.0);
}

#[test]
fn corrupted_market_is_halted_on_restore() {
    let (t, users) = seeded_book();
    let m = market_id("m");
    let mut snapshot = t.store.load().unwrap();
    snapshot.markets[0].outcomes[0].total_pool += 1;

    let (tx, _rx) = event::channel(100);
    let store = Arc::new(MemoryStore::with_snapshot(snapshot));
    let (engine, reports) = Engine::restore(EngineSettings::default(), store.clone(), tx).unwrap();

    assert_eq!(reports.len(), 1);
    assert!(!reports[0].is_consistent());
    let halted = engine.market(&m).unwrap();
    assert!(halted.halted_reason.is_some());
    assert!(store.load().unwrap().markets[0].halted_reason.is_some());

    let err = engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::InconsistentState { .. })));
    let err = engine
        .place_bet(&users[0], &m, &nth_outcome("m", 0), 10)
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::InconsistentState { .. })));
    assert!(engine.audit_market(&m).is_err());
}

#[test]
fn restore_rebuilds_balances_and_book() {
    let (t, users) = seeded_book();
    let snapshot = t.store.load().unwrap();

    let (tx, _rx) = event::channel(100);
    let (engine, reports) = Engine::restore(
        EngineSettings::default(),
        Arc::new(MemoryStore::with_snapshot(snapshot)),
        tx,
    )
    .unwrap();

    assert!(reports.iter().all(|r| r.is_consistent()));
    for user in &users {
        assert_eq!(engine.balance(user).unwrap(), t.engine.balance(user).unwrap());
        assert_eq!(
            engine.ledger_entries(user).unwrap(),
            t.engine.ledger_entries(user).unwrap()
        );
    }
    let m = market_id("m");
    assert_eq!(engine.market(&m).unwrap(), t.engine.market(&m).unwrap());
    assert_eq!(engine.wagers(&m).unwrap(), t.engine.wagers(&m).unwrap());

    assert!(matches!(
        engine.resolve_market(&m, &nth_outcome("m", 0)).unwrap(),
        Resolution::Resolved(_)
    ));
}

#[test]
fn monthly_bonus_once_per_calendar_month() {
    let t = TestEngine::new();
    let users = t.accounts(&["alice"]);

    let entry = t.engine.claim_monthly_bonus(&users[0]).unwrap();
    assert_eq!(entry.kind, EntryKind::MonthlyBonus);
    assert_eq!(entry.balance_after, 1200);

    let err = t.engine.claim_monthly_bonus(&users[0]).unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::BonusUnavailable(_))));

    t.clock.advance(Duration::days(10));
    assert!(t.engine.claim_monthly_bonus(&users[0]).is_err());

    t.clock.advance(Duration::days(7));
    let entry = t.engine.claim_monthly_bonus(&users[0]).unwrap();
    assert_eq!(entry.balance_after, 1400);

    let kinds: Vec<EntryKind> = t
        .engine
        .ledger_entries(&users[0])
        .unwrap()
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![EntryKind::SignupBonus, EntryKind::MonthlyBonus, EntryKind::MonthlyBonus]
    );
}

#[test]
fn duplicate_account_is_rejected() {
    let t = TestEngine::new();
    let users = t.accounts(&["alice"]);
    let err = t.engine.open_account(&users[0]).unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::AccountExists(_))));
    assert_eq!(t.engine.balance(&users[0]).unwrap(), 1000);
}

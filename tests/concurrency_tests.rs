mod support;

use std::thread;
use std::time::Duration;

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use support::assertions::total_balance;
use wagerbook::application::{EngineSettings, Resolution};
use wagerbook::domain::pricing::{self, OutcomeState};
use wagerbook::domain::{Credits, DriftPolicy, Market, MarketStatus, Wager};
use wagerbook::testkit::domain::{market_id, nth_outcome};
use wagerbook::testkit::engine::TestEngine;

fn patient() -> TestEngine {
    TestEngine::with_settings(EngineSettings {
        lock_timeout: Duration::from_secs(10),
        settlement_lock_timeout: Duration::from_secs(10),
        ..EngineSettings::default()
    })
}

/// Reprice `wagers` one at a time from the market's opening prices,
/// checking each wager's locked odds, and return the final probabilities.
fn replay_serially(market: &Market, wagers: &[Wager]) -> Vec<f64> {
    let mut states: Vec<OutcomeState> = market
        .outcomes
        .iter()
        .map(|o| OutcomeState {
            probability: o.initial_probability,
            pool: 0,
        })
        .collect();
    let mut bettors = HashSet::new();

    for (total_bets, wager) in wagers.iter().enumerate() {
        let index = market.outcome_index(&wager.outcome_id).unwrap();
        assert_eq!(
            wager.odds_at_purchase, states[index].probability,
            "wager {total_bets} priced off a stale probability"
        );
        let repricing = pricing::reprice(
            &states,
            index,
            wager.amount,
            total_bets as u64,
            bettors.len() as u64,
            DriftPolicy::Preserve,
        )
        .unwrap();
        for (state, probability) in states.iter_mut().zip(&repricing.probabilities) {
            state.probability = *probability;
        }
        states[index].pool += wager.amount;
        bettors.insert(wager.user_id.clone());
    }
    states.iter().map(|s| s.probability).collect()
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("bettor-{i:02}")).collect()
}

#[test]
fn parallel_wagers_conserve_credits() {
    let t = patient();
    let names = names(8);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let users = t.accounts(&refs);
    t.market("m", &[0.4, 0.35, 0.25]);
    let m = market_id("m");

    thread::scope(|scope| {
        for (i, user) in users.iter().enumerate() {
            let engine = &t.engine;
            let m = &m;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(i as u64);
                for _ in 0..40 {
                    let outcome = nth_outcome("m", rng.gen_range(0..3));
                    let amount: Credits = rng.gen_range(1..=20);
                    engine.place_bet(user, m, &outcome, amount).unwrap();
                }
            });
        }
    });

    let market = t.engine.market(&m).unwrap();
    assert_eq!(market.total_bets, 8 * 40);
    assert_eq!(market.unique_bettors, 8);
    assert_eq!(
        total_balance(&t.engine, &users) + market.total_pool(),
        8 * 1000
    );
    assert!(t.engine.audit_market(&m).unwrap().is_consistent());

    let wagers = t.engine.wagers(&m).unwrap();
    assert_eq!(wagers.len(), 8 * 40);
    let current: Vec<f64> = market.outcomes.iter().map(|o| o.current_probability).collect();
    assert_eq!(replay_serially(&market, &wagers), current);

    for user in &users {
        let entries = t.engine.ledger_entries(user).unwrap();
        let last = entries.last().unwrap();
        assert_eq!(last.balance_after, t.engine.balance(user).unwrap());
        let sum: Credits = entries.iter().map(|e| e.amount).sum();
        assert_eq!(sum, last.balance_after);
    }
}

#[test]
fn one_bettor_racing_itself_never_overdraws() {
    let t = patient();
    let users = t.accounts(&["alice"]);
    t.market("m", &[0.5, 0.5]);
    let m = market_id("m");

    let placed: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|side| {
                let engine = &t.engine;
                let user = &users[0];
                let m = &m;
                scope.spawn(move || {
                    let outcome = nth_outcome("m", side % 2);
                    (0..100)
                        .filter(|_| engine.place_bet(user, m, &outcome, 7).is_ok())
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(placed, 1000 / 7);
    let balance = t.engine.balance(&users[0]).unwrap();
    assert_eq!(balance, 1000 % 7);
    assert_eq!(t.engine.market(&m).unwrap().total_pool(), 1000 - balance);
}

#[test]
fn crossing_markets_do_not_deadlock() {
    let t = patient();
    let names = names(6);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let users = t.accounts(&refs);
    for id in ["a", "b", "c"] {
        t.market(id, &[0.5, 0.5]);
    }

    thread::scope(|scope| {
        for (i, user) in users.iter().enumerate() {
            let engine = &t.engine;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + i as u64);
                for _ in 0..30 {
                    let id = ["a", "b", "c"][rng.gen_range(0..3)];
                    let outcome = nth_outcome(id, rng.gen_range(0..2));
                    engine.place_bet(user, &market_id(id), &outcome, 5).unwrap();
                }
            });
        }
    });

    let staked: Credits = ["a", "b", "c"]
        .iter()
        .map(|id| t.engine.market(&market_id(id)).unwrap().total_pool())
        .sum();
    assert_eq!(staked, 6 * 30 * 5);
    assert_eq!(total_balance(&t.engine, &users) + staked, 6 * 1000);
}

#[test]
fn wagers_racing_resolution_settle_exactly_once() {
    let t = patient();
    let names = names(4);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let users = t.accounts(&refs);
    t.market("m", &[0.5, 0.5]);
    let m = market_id("m");

    let resolutions = thread::scope(|scope| {
        for user in &users {
            let engine = &t.engine;
            let m = &m;
            scope.spawn(move || {
                for _ in 0..50 {
                    // Late wagers are refused once the market is settled.
                    let _ = engine.place_bet(user, m, &nth_outcome("m", 1), 3);
                }
            });
        }
        let resolvers: Vec<_> = (0..3)
            .map(|_| {
                let engine = &t.engine;
                let m = &m;
                scope.spawn(move || {
                    thread::sleep(Duration::from_millis(5));
                    engine.resolve_market(m, &nth_outcome("m", 1)).unwrap()
                })
            })
            .collect();
        resolvers
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    let settled = resolutions
        .iter()
        .filter(|r| matches!(r, Resolution::Resolved(_)))
        .count();
    assert_eq!(settled, 1);

    let market = t.engine.market(&m).unwrap();
    assert_eq!(market.status, MarketStatus::Resolved);
    let wagers = t.engine.wagers(&m).unwrap();
    assert!(wagers.iter().all(|w| !w.settlement.is_pending()));

    let staked: Credits = wagers.iter().map(|w| w.amount).sum();
    let paid: Credits = wagers.iter().map(|w| w.potential_payout).sum();
    assert_eq!(total_balance(&t.engine, &users), 4 * 1000 - staked + paid);
}

use wagerbook::application::Engine;
use wagerbook::domain::{Credits, UserId};

pub fn assert_near(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}

/// Sum of the balances of `users`.
pub fn total_balance(engine: &Engine, users: &[UserId]) -> Credits {
    users
        .iter()
        .map(|u| engine.balance(u).expect("balance"))
        .sum()
}

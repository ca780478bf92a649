//! Handler for `wagerbook simulate`.
//!
//! Spins up an in-memory engine, lets several bettors hammer one market
//! from blocking tasks, settles it and prints the final book.

use std::sync::Arc;

use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;

use super::command::SimulateArgs;
use super::output;
use crate::adapter::outbound::badge::BadgeTracker;
use crate::adapter::outbound::memory::MemoryStore;
use crate::application::event;
use crate::application::{Cancellation, Engine, EngineSettings, Resolution};
use crate::domain::{
    AuditReport, Credits, Market, MarketId, NewMarket, NewOutcome, OutcomeId, UserId,
    MAX_OUTCOMES, MIN_OUTCOMES,
};
use crate::error::{LedgerError, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

const MARKET_ID: &str = "sim";

/// What one bettor (or the whole run) managed to do.
#[derive(Debug, Default, Clone, Copy, Serialize)]
struct Tally {
    placed: u64,
    staked: Credits,
    insufficient: u64,
    contended: u64,
}

impl Tally {
    fn merge(&mut self, other: Self) {
        self.placed += other.placed;
        self.staked += other.staked;
        self.insufficient += other.insufficient;
        self.contended += other.contended;
    }
}

#[derive(Serialize)]
struct SimulationReport {
    bettors: usize,
    tally: Tally,
    settlement: Settlement,
    account_credits: Credits,
    audit: AuditReport,
    badges_awarded: usize,
    events_delivered: usize,
    market: Market,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Settlement {
    Resolved {
        winner: OutcomeId,
        result: Resolution,
    },
    Cancelled {
        result: Cancellation,
    },
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Outcome")]
    id: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Pool")]
    pool: i64,
    #[tabled(rename = "Winner")]
    winner: String,
}

fn definition(engine: &Engine, outcomes: usize) -> Result<NewMarket> {
    let share = 1.0 / outcomes as f64;
    Ok(NewMarket::try_new(
        MarketId::new(MARKET_ID),
        "Simulated market",
        "Generated by wagerbook simulate",
        engine.now() + Duration::days(7),
        (0..outcomes)
            .map(|i| NewOutcome::new(format!("{MARKET_ID}-{i}"), format!("Outcome {i}"), share))
            .collect(),
    )?)
}

fn run_bettor(
    engine: &Engine,
    user: &UserId,
    outcomes: &[OutcomeId],
    bets: usize,
    max_stake: Credits,
    seed: u64,
) -> Result<Tally> {
    let market_id = MarketId::new(MARKET_ID);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tally = Tally::default();

    for _ in 0..bets {
        let outcome = &outcomes[rng.gen_range(0..outcomes.len())];
        let amount = rng.gen_range(1..=max_stake);
        match engine.place_bet(user, &market_id, outcome, amount) {
            Ok(placed) => {
                tally.placed += 1;
                tally.staked += placed.wager.amount;
            }
            Err(err) if err.is_retryable() => tally.contended += 1,
            Err(err) if matches!(err.as_ledger(), Some(LedgerError::InsufficientBalance { .. })) => {
                tally.insufficient += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(tally)
}

/// Execute `simulate`.
pub async fn execute(config: &Config, args: &SimulateArgs) -> Result<()> {
    let outcome_count = args.outcomes.clamp(MIN_OUTCOMES, MAX_OUTCOMES);
    let (tx, mut rx) = event::channel(config.events.backlog_warning);
    let engine = Arc::new(Engine::new(
        EngineSettings::from(config),
        Arc::new(MemoryStore::new()),
        tx,
    ));

    let market = engine.create_market(definition(&engine, outcome_count)?)?;
    let outcome_ids: Arc<[OutcomeId]> = market.outcomes.iter().map(|o| o.id.clone()).collect();
    let users: Vec<UserId> = (0..args.bettors)
        .map(|i| UserId::new(format!("bettor-{i:02}")))
        .collect();
    for user in &users {
        engine.open_account(user)?;
    }

    info!(bettors = args.bettors, bets = args.bets, outcomes = outcome_count, "simulation started");
    let mut handles = Vec::with_capacity(users.len());
    for (i, user) in users.iter().enumerate() {
        let engine = Arc::clone(&engine);
        let outcomes = Arc::clone(&outcome_ids);
        let user = user.clone();
        let bets = args.bets;
        let max_stake = args.max_stake.max(1);
        let seed = args.seed.wrapping_add(i as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            run_bettor(&engine, &user, &outcomes, bets, max_stake, seed)
        }));
    }

    let mut tally = Tally::default();
    for handle in handles {
        tally.merge(handle.await??);
    }

    let market_id = MarketId::new(MARKET_ID);
    let settlement = if args.cancel {
        Settlement::Cancelled {
            result: engine.cancel_market(&market_id, "simulation cancelled")?,
        }
    } else {
        let mut rng = StdRng::seed_from_u64(args.seed);
        let winner = outcome_ids[rng.gen_range(0..outcome_ids.len())].clone();
        let result = engine.resolve_market(&market_id, &winner)?;
        Settlement::Resolved { winner, result }
    };
    let audit = engine.audit_market(&market_id)?;

    let badges = Arc::new(BadgeTracker::standard());
    let registry = bootstrap::build_notifier_registry(Some(Arc::clone(&badges)));
    let events_delivered = rx.drain(&registry);
    let badges_awarded = badges.all_awards().values().map(Vec::len).sum();

    let mut account_credits = 0;
    for user in &users {
        account_credits += engine.balance(user)?;
    }

    let report = SimulationReport {
        bettors: users.len(),
        tally,
        settlement,
        account_credits,
        audit,
        badges_awarded,
        events_delivered,
        market: engine.market(&market_id)?,
    };

    if output::is_json() {
        output::data("simulation", &report);
        return Ok(());
    }
    render(&report);
    Ok(())
}

fn render(report: &SimulationReport) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Simulation");
    output::field("Bettors", report.bettors);
    output::field("Wagers placed", report.tally.placed);
    output::field("Credits staked", report.tally.staked);
    output::field("Insufficient", report.tally.insufficient);
    output::field("Lock timeouts", report.tally.contended);

    output::section("Settlement");
    match &report.settlement {
        Settlement::Resolved {
            winner,
            result: Resolution::Resolved(summary),
        } => {
            output::field("Winner", winner);
            output::field("Payouts", summary.credits_issued);
            output::field("Credited", output::positive(summary.total_credited));
        }
        Settlement::Cancelled {
            result: Cancellation::Cancelled(summary),
        } => {
            output::field("Refunds", summary.credits_issued);
            output::field("Refunded", summary.total_credited);
        }
        _ => output::note("market was already settled"),
    }
    output::field("Account credits", report.account_credits);
    output::field("Badges awarded", report.badges_awarded);
    if report.audit.is_consistent() {
        output::success("ledger audit passed");
    } else {
        output::warning(&output::negative(report.audit.violations.join("; ")));
    }

    output::section("Final book");
    let rows = report.market.outcomes.iter().map(|o| OutcomeRow {
        id: o.id.to_string(),
        probability: output::percent(o.current_probability),
        pool: o.total_pool,
        winner: match o.is_winner {
            Some(true) => "yes".into(),
            Some(false) => "no".into(),
            None => "-".into(),
        },
    });
    output::lines(&Table::new(rows).to_string());
}

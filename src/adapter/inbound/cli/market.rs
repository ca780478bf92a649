//! Handler for `wagerbook market <id>`.

use serde::Serialize;
use tabled::{Table, Tabled};

use super::output;
use crate::domain::{Market, MarketId, Wager};
use crate::error::{LedgerError, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;
use crate::port::LedgerStore;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Outcome")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Initial")]
    initial: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Pool")]
    pool: i64,
    #[tabled(rename = "Winner")]
    winner: String,
}

#[derive(Serialize)]
struct MarketView<'a> {
    market: &'a Market,
    wagers: Vec<&'a Wager>,
}

/// Execute `market`. Reads the store directly; nothing is written.
pub fn execute(config: &Config, id: &str) -> Result<()> {
    let store = bootstrap::open_store(&config.database)?;
    let snapshot = store.load()?;
    let market_id = MarketId::new(id);
    let market = snapshot
        .markets
        .iter()
        .find(|m| m.id == market_id)
        .ok_or_else(|| LedgerError::MarketNotFound(market_id.clone()))?;
    let wagers: Vec<&Wager> = snapshot
        .wagers
        .iter()
        .filter(|w| w.market_id == market_id)
        .collect();

    if output::is_json() {
        output::data("market", &MarketView { market, wagers });
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section(&market.title);
    output::field("Id", &market.id);
    output::field("Status", market.status);
    output::field("Closes", market.closes_at.to_rfc3339());
    output::field("Wagers", market.total_bets);
    output::field("Bettors", market.unique_bettors);
    output::field("Pool", market.total_pool());
    if let Some(reason) = &market.cancel_reason {
        output::field("Cancelled", reason);
    }
    if let Some(reason) = &market.halted_reason {
        output::warning(&format!("halted: {reason}"));
    }

    output::section("Outcomes");
    let rows = market.outcomes.iter().map(|o| OutcomeRow {
        id: o.id.to_string(),
        label: o.label.clone(),
        initial: output::percent(o.initial_probability),
        current: output::percent(o.current_probability),
        pool: o.total_pool,
        winner: match o.is_winner {
            Some(true) => "yes".into(),
            Some(false) => "no".into(),
            None => "-".into(),
        },
    });
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

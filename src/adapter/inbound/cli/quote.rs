//! Handler for `wagerbook quote`.

use serde::Serialize;

use super::command::QuoteArgs;
use super::output;
use crate::domain::pricing::{self, PricingInput};
use crate::domain::{Credits, PriceMove};
use crate::error::{Error, LedgerError, Result};

#[derive(Debug, Serialize)]
struct QuoteReport {
    current_probability: f64,
    amount: Credits,
    potential_payout: Credits,
    #[serde(flatten)]
    price: PriceMove,
}

/// Execute `quote`.
pub fn execute(args: &QuoteArgs) -> Result<()> {
    if !(args.probability > 0.0 && args.probability < 1.0) {
        return Err(Error::Parse(format!(
            "probability must be between 0 and 1 (exclusive), got {}",
            args.probability
        )));
    }
    if args.amount <= 0 {
        return Err(LedgerError::InvalidAmount {
            amount: args.amount,
        }
        .into());
    }
    if args.outcome_pool < 0 || args.total_pool < args.outcome_pool {
        return Err(Error::Parse(
            "pools must satisfy 0 <= outcome-pool <= total-pool".to_string(),
        ));
    }

    let price = pricing::price(&PricingInput {
        current_probability: args.probability,
        bet_amount: args.amount,
        outcome_pool: args.outcome_pool,
        total_pool: args.total_pool,
        total_bets: args.total_bets,
        unique_bettors: args.unique_bettors,
    });
    let report = QuoteReport {
        current_probability: args.probability,
        amount: args.amount,
        potential_payout: pricing::potential_payout(args.amount, args.probability),
        price,
    };

    if output::is_json() {
        output::data("quote", &report);
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Quote");
    output::field("Stake", report.amount);
    output::field("Odds locked at", output::percent(report.current_probability));
    output::field("Potential payout", output::positive(report.potential_payout));
    output::section("Price move");
    output::field("New probability", output::percent(price.new_probability));
    output::field("Implied odds", format!("{:.4}", price.implied_odds));
    output::field("Virtual liquidity", format!("{:.2}", price.virtual_liquidity));
    output::field("Diversity factor", format!("{:.3}", price.diversity_factor));
    output::field("Decay rate", format!("{:.2}", price.effective_decay_rate));
    Ok(())
}

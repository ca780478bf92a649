//! Liquidity-bootstrapped AMM with diversity-adjusted decay.
//!
//! Every market starts with an imaginary pool of [`MAX_VIRTUAL_LIQUIDITY`]
//! credits, split across outcomes according to their current probability.
//! The virtual pool decays exponentially with the number of wagers placed,
//! so early bets move prices gently while later bets are priced mostly by
//! real credits. The decay accelerates as more distinct users participate:
//! once [`DIVERSITY_THRESHOLD`] bettors are present the effective decay rate
//! reaches `BASE_DECAY_RATE + DIVERSITY_DECAY_BONUS`.
//!
//! ```text
//! diversity  = min(unique_bettors / 20, 1)
//! decay_rate = 15 + 10 * diversity
//! virtual    = 5000 * exp(-total_bets / decay_rate)
//! p'         = (pool_o + virtual*p + bet) / (pool_total + virtual + bet)
//! ```
//!
//! All arithmetic is plain IEEE `f64` in a fixed evaluation order. Payouts
//! recorded elsewhere depend on these exact values, so the order of
//! operations below must not be "simplified".

use serde::{Deserialize, Serialize};

use super::Credits;

/// Starting virtual credits.
pub const MAX_VIRTUAL_LIQUIDITY: f64 = 5000.0;
/// Number of bets per e-fold of virtual liquidity with no diversity.
pub const BASE_DECAY_RATE: f64 = 15.0;
/// Distinct bettors needed for full diversity.
pub const DIVERSITY_THRESHOLD: f64 = 20.0;
/// Additional decay rate at full diversity.
pub const DIVERSITY_DECAY_BONUS: f64 = 10.0;
/// Lowest probability any outcome may be priced at.
pub const MIN_PROBABILITY: f64 = 0.05;
/// Highest probability any outcome may be priced at.
pub const MAX_PROBABILITY: f64 = 0.95;
/// Allowed deviation from 1 when validating initial probabilities.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

/// Market aggregates and the candidate wager, all taken *before* the wager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInput {
    /// Probability of the outcome being bet on.
    pub current_probability: f64,
    /// Credits being wagered.
    pub bet_amount: Credits,
    /// Real credits already on this outcome.
    pub outcome_pool: Credits,
    /// Real credits across all outcomes of the market.
    pub total_pool: Credits,
    /// Wagers placed on the market so far.
    pub total_bets: u64,
    /// Distinct users who have wagered on the market so far.
    pub unique_bettors: u64,
}

/// Result of pricing one wager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceMove {
    /// Outcome probability after the wager, clamped to the allowed band.
    pub new_probability: f64,
    /// Virtual credits still subsidising the market.
    pub virtual_liquidity: f64,
    /// Participation measure in `[0, 1]`.
    pub diversity_factor: f64,
    /// Decay rate used for this wager.
    pub effective_decay_rate: f64,
    /// Decimal odds at the new probability.
    pub implied_odds: f64,
}

/// What to do when independent clamping leaves the outcome set not summing to 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftPolicy {
    /// Leave the clamped values as they are.
    #[default]
    Preserve,
    /// Divide by the post-clamp sum, then clamp again.
    Renormalize,
}

/// Probability and real pool of one outcome, in market order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeState {
    pub probability: f64,
    pub pool: Credits,
}

/// A priced wager together with the rescaled probability of every outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Repricing {
    pub price: PriceMove,
    /// New probabilities, index-aligned with the input outcomes.
    pub probabilities: Vec<f64>,
}

/// Clamp a probability into `[MIN_PROBABILITY, MAX_PROBABILITY]`.
#[must_use]
pub fn clamp_probability(value: f64) -> f64 {
    MIN_PROBABILITY.max(MAX_PROBABILITY.min(value))
}

/// Price a single wager against the outcome it targets.
#[must_use]
pub fn price(input: &PricingInput) -> PriceMove {
    let diversity_factor = (input.unique_bettors as f64 / DIVERSITY_THRESHOLD).min(1.0);
    let effective_decay_rate = BASE_DECAY_RATE + DIVERSITY_DECAY_BONUS * diversity_factor;
    let virtual_liquidity =
        MAX_VIRTUAL_LIQUIDITY * (-(input.total_bets as f64) / effective_decay_rate).exp();

    let virtual_outcome_pool = virtual_liquidity * input.current_probability;
    let virtual_other_pool = virtual_liquidity * (1.0 - input.current_probability);

    let outcome_pool = input.outcome_pool as f64;
    let total_outcome_pool = outcome_pool + virtual_outcome_pool;
    let total_other_pool = (input.total_pool as f64 - outcome_pool) + virtual_other_pool;

    let bet = input.bet_amount as f64;
    let new_outcome_pool = total_outcome_pool + bet;
    let new_total_pool = total_outcome_pool + total_other_pool + bet;

    let new_probability = clamp_probability(new_outcome_pool / new_total_pool);

    PriceMove {
        new_probability,
        virtual_liquidity,
        diversity_factor,
        effective_decay_rate,
        implied_odds: 1.0 / new_probability,
    }
}

/// Price a wager on `outcomes[bet_index]` and rescale every other outcome.
///
/// Non-bet outcomes share `1 - p'` in proportion to their previous
/// probabilities (evenly if those sum to zero) and are clamped one by one.
/// Returns `None` when `bet_index` is out of range.
#[must_use]
pub fn reprice(
    outcomes: &[OutcomeState],
    bet_index: usize,
    bet_amount: Credits,
    total_bets: u64,
    unique_bettors: u64,
    policy: DriftPolicy,
) -> Option<Repricing> {
    let target = outcomes.get(bet_index)?;
    let total_pool: Credits = outcomes.iter().map(|o| o.pool).sum();

    let price = price(&PricingInput {
        current_probability: target.probability,
        bet_amount,
        outcome_pool: target.pool,
        total_pool,
        total_bets,
        unique_bettors,
    });

    let remaining = 1.0 - price.new_probability;
    let other_count = outcomes.len() - 1;
    let other_total: f64 = outcomes
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != bet_index)
        .map(|(_, o)| o.probability)
        .sum();

    let mut probabilities: Vec<f64> = outcomes
        .iter()
        .enumerate()
        .map(|(i, o)| {
            if i == bet_index {
                return price.new_probability;
            }
            let proportion = if other_total > 0.0 {
                o.probability / other_total
            } else {
                1.0 / other_count as f64
            };
            clamp_probability(remaining * proportion)
        })
        .collect();

    if policy == DriftPolicy::Renormalize {
        let sum: f64 = probabilities.iter().sum();
        if sum > 0.0 {
            for p in &mut probabilities {
                *p = clamp_probability(*p / sum);
            }
        }
    }

    Some(Repricing {
        price,
        probabilities,
    })
}

/// Credits paid to a winning wager bought at `probability`.
///
/// Computed as `floor(amount * (1 / probability))`.
#[must_use]
pub fn potential_payout(amount: Credits, probability: f64) -> Credits {
    let decimal_odds = 1.0 / probability;
    (amount as f64 * decimal_odds).floor() as Credits
}

/// Whether a set of initial probabilities sums to 1 within tolerance.
#[must_use]
pub fn probabilities_sum_to_one(probabilities: &[f64]) -> bool {
    let sum: f64 = probabilities.iter().sum();
    (sum - 1.0).abs() < PROBABILITY_SUM_TOLERANCE
}

/// Scale probabilities to sum to exactly 1 (equal split if they are all 0).
#[must_use]
pub fn normalize_probabilities(probabilities: &[f64]) -> Vec<f64> {
    let sum: f64 = probabilities.iter().sum();
    if sum == 0.0 {
        let even = 1.0 / probabilities.len() as f64;
        return vec![even; probabilities.len()];
    }
    probabilities.iter().map(|p| p / sum).collect()
}

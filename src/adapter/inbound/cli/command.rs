//! Command-line interface definitions.
//!
//! Defines the `wagerbook` CLI using `clap`. Every subcommand reads the
//! same TOML configuration file; `--json` switches all output to JSON lines.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default configuration file path.
pub const DEFAULT_CONFIG: &str = "wagerbook.toml";

/// Pricing and settlement engine for credit-based prediction markets
#[derive(Parser, Debug)]
#[command(name = "wagerbook")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults apply when it is missing)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Price a hypothetical wager from raw market figures
    Quote(QuoteArgs),

    /// Show a persisted market and its outcomes
    Market(MarketArgs),

    /// Restore the ledger from the database and audit every market
    Audit,

    /// Run concurrent simulated bettors against an in-memory engine
    Simulate(SimulateArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `wagerbook config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration with defaults applied
    Show,
    /// Validate the configuration file
    Check,
}

/// Arguments for `wagerbook quote`.
#[derive(Parser, Debug)]
pub struct QuoteArgs {
    /// Current probability of the outcome, in (0, 1)
    #[arg(long)]
    pub probability: f64,

    /// Wager amount in credits
    #[arg(long)]
    pub amount: i64,

    /// Credits already staked on this outcome
    #[arg(long, default_value_t = 0)]
    pub outcome_pool: i64,

    /// Credits staked on the whole market
    #[arg(long, default_value_t = 0)]
    pub total_pool: i64,

    /// Wagers already placed on the market
    #[arg(long, default_value_t = 0)]
    pub total_bets: u64,

    /// Distinct bettors on the market
    #[arg(long, default_value_t = 0)]
    pub unique_bettors: u64,
}

/// Arguments for `wagerbook market`.
#[derive(Parser, Debug)]
pub struct MarketArgs {
    /// Market identifier
    pub id: String,
}

/// Arguments for `wagerbook simulate`.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Number of concurrent bettors
    #[arg(long, default_value_t = 8)]
    pub bettors: usize,

    /// Wagers each bettor attempts
    #[arg(long, default_value_t = 25)]
    pub bets: usize,

    /// Number of outcomes in the simulated market
    #[arg(long, default_value_t = 2)]
    pub outcomes: usize,

    /// Largest single stake a bettor tries
    #[arg(long, default_value_t = 100)]
    pub max_stake: i64,

    /// Random seed
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Cancel the market at the end instead of resolving it
    #[arg(long)]
    pub cancel: bool,
}

//! Monetary types.

/// Abstract integer credits. Negative values only appear as signed ledger
/// amounts (debits); balances never go below zero.
pub type Credits = i64;

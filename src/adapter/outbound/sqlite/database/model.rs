//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{accounts, ledger_entries, markets, outcomes, wagers};

/// Database row for a market.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub closes_at: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub total_bets: i64,
    pub unique_bettors: i64,
    pub cancel_reason: Option<String>,
    pub halted_reason: Option<String>,
}

/// Database row for an outcome.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = outcomes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OutcomeRecord {
    pub market_id: String,
    pub id: String,
    pub position: i32,
    pub label: String,
    pub initial_probability: f64,
    pub current_probability: f64,
    pub total_pool: i64,
    pub is_winner: Option<bool>,
}

/// Database row for a wager.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = wagers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WagerRecord {
    pub id: String,
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub amount: i64,
    pub odds_at_purchase: f64,
    pub potential_payout: i64,
    pub balance_before: i64,
    pub placed_at: String,
    pub settlement: String,
    pub paid: Option<i64>,
}

/// Database row for an account.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountRecord {
    pub user_id: String,
    pub balance: i64,
    pub created_at: String,
    pub last_bonus_at: Option<String>,
}

/// Database row for a ledger entry (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
pub struct NewEntryRecord {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub reference: Option<String>,
    pub description: String,
    pub created_at: String,
}

/// Database row for a ledger entry (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryRecord {
    pub seq: Option<i32>,
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub balance_after: i64,
    pub reference: Option<String>,
    pub description: String,
    pub created_at: String,
}

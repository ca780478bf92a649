//! SQLite ledger store implementation.
//!
//! Each changeset is written inside one `BEGIN IMMEDIATE` transaction so a
//! crash or constraint failure never leaves a partial settlement behind.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    AccountRecord, EntryRecord, MarketRecord, NewEntryRecord, OutcomeRecord, WagerRecord,
};
use crate::adapter::outbound::sqlite::database::schema::{
    accounts, ledger_entries, markets, outcomes, wagers,
};
use crate::domain::{
    AccountRow, Changeset, EntryId, EntryKind, LedgerEntry, Market, MarketId, MarketStatus,
    Outcome, OutcomeId, Snapshot, UserId, Wager, WagerId, WagerSettlement,
};
use crate::error::{Error, Result};
use crate::port::LedgerStore;

/// SQLite-backed ledger store.
pub struct SqliteStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn market_records(market: &Market) -> Result<(MarketRecord, Vec<OutcomeRecord>)> {
        let record = MarketRecord {
            id: market.id.to_string(),
            title: market.title.clone(),
            description: market.description.clone(),
            status: market.status.as_str().to_string(),
            closes_at: market.closes_at.to_rfc3339(),
            created_at: market.created_at.to_rfc3339(),
            resolved_at: market.resolved_at.map(|t| t.to_rfc3339()),
            total_bets: to_i64(market.total_bets)?,
            unique_bettors: to_i64(market.unique_bettors)?,
            cancel_reason: market.cancel_reason.clone(),
            halted_reason: market.halted_reason.clone(),
        };
        let outcome_records = market
            .outcomes
            .iter()
            .enumerate()
            .map(|(position, o)| {
                Ok(OutcomeRecord {
                    market_id: market.id.to_string(),
                    id: o.id.to_string(),
                    position: i32::try_from(position).map_err(|e| Error::Parse(e.to_string()))?,
                    label: o.label.clone(),
                    initial_probability: o.initial_probability,
                    current_probability: o.current_probability,
                    total_pool: o.total_pool,
                    is_winner: o.is_winner,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((record, outcome_records))
    }

    fn market_from_records(record: MarketRecord, outcome_records: Vec<OutcomeRecord>) -> Result<Market> {
        let status = MarketStatus::parse(&record.status)
            .ok_or_else(|| Error::Parse(format!("unknown market status: {}", record.status)))?;
        Ok(Market {
            id: MarketId::from(record.id),
            title: record.title,
            description: record.description,
            status,
            closes_at: parse_time(&record.closes_at)?,
            created_at: parse_time(&record.created_at)?,
            resolved_at: record.resolved_at.as_deref().map(parse_time).transpose()?,
            total_bets: to_u64(record.total_bets)?,
            unique_bettors: to_u64(record.unique_bettors)?,
            cancel_reason: record.cancel_reason,
            halted_reason: record.halted_reason,
            outcomes: outcome_records
                .into_iter()
                .map(|o| Outcome {
                    id: OutcomeId::from(o.id),
                    label: o.label,
                    initial_probability: o.initial_probability,
                    current_probability: o.current_probability,
                    total_pool: o.total_pool,
                    is_winner: o.is_winner,
                })
                .collect(),
        })
    }

    fn wager_record(wager: &Wager) -> WagerRecord {
        let paid = match wager.settlement {
            WagerSettlement::Won { paid } => Some(paid),
            _ => None,
        };
        WagerRecord {
            id: wager.id.to_string(),
            user_id: wager.user_id.to_string(),
            market_id: wager.market_id.to_string(),
            outcome_id: wager.outcome_id.to_string(),
            amount: wager.amount,
            odds_at_purchase: wager.odds_at_purchase,
            potential_payout: wager.potential_payout,
            balance_before: wager.balance_before,
            placed_at: wager.placed_at.to_rfc3339(),
            settlement: wager.settlement.as_str().to_string(),
            paid,
        }
    }

    fn wager_from_record(record: WagerRecord) -> Result<Wager> {
        let settlement = match (record.settlement.as_str(), record.paid) {
            ("pending", _) => WagerSettlement::Pending,
            ("won", Some(paid)) => WagerSettlement::Won { paid },
            ("lost", _) => WagerSettlement::Lost,
            ("refunded", _) => WagerSettlement::Refunded,
            (other, paid) => {
                return Err(Error::Parse(format!(
                    "invalid wager settlement {other} (paid {paid:?}) for {}",
                    record.id
                )))
            }
        };
        Ok(Wager {
            id: record.id.parse::<WagerId>().map_err(|e| Error::Parse(e.to_string()))?,
            user_id: UserId::from(record.user_id),
            market_id: MarketId::from(record.market_id),
            outcome_id: OutcomeId::from(record.outcome_id),
            amount: record.amount,
            odds_at_purchase: record.odds_at_purchase,
            potential_payout: record.potential_payout,
            balance_before: record.balance_before,
            placed_at: parse_time(&record.placed_at)?,
            settlement,
        })
    }

    fn account_record(row: &AccountRow) -> AccountRecord {
        AccountRecord {
            user_id: row.user_id.to_string(),
            balance: row.balance,
            created_at: row.created_at.to_rfc3339(),
            last_bonus_at: row.last_bonus_at.map(|t| t.to_rfc3339()),
        }
    }

    fn account_from_record(record: AccountRecord) -> Result<AccountRow> {
        Ok(AccountRow {
            user_id: UserId::from(record.user_id),
            balance: record.balance,
            created_at: parse_time(&record.created_at)?,
            last_bonus_at: record.last_bonus_at.as_deref().map(parse_time).transpose()?,
        })
    }

    fn entry_record(entry: &LedgerEntry) -> NewEntryRecord {
        NewEntryRecord {
            id: entry.id.to_string(),
            user_id: entry.user_id.to_string(),
            kind: entry.kind.as_str().to_string(),
            amount: entry.amount,
            balance_after: entry.balance_after,
            reference: entry.reference.clone(),
            description: entry.description.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }

    fn entry_from_record(record: EntryRecord) -> Result<LedgerEntry> {
        let kind = EntryKind::parse(&record.kind)
            .ok_or_else(|| Error::Parse(format!("unknown ledger entry kind: {}", record.kind)))?;
        Ok(LedgerEntry {
            id: record.id.parse::<EntryId>().map_err(|e| Error::Parse(e.to_string()))?,
            user_id: UserId::from(record.user_id),
            kind,
            amount: record.amount,
            balance_after: record.balance_after,
            reference: record.reference,
            description: record.description,
            created_at: parse_time(&record.created_at)?,
        })
    }

    fn write(conn: &mut SqliteConnection, changes: &Changeset) -> Result<()> {
        let mut market_rows = Vec::with_capacity(changes.markets.len());
        for market in &changes.markets {
            market_rows.push(Self::market_records(market)?);
        }
        let wager_rows: Vec<WagerRecord> = changes.wagers.iter().map(Self::wager_record).collect();
        let account_rows: Vec<AccountRecord> =
            changes.accounts.iter().map(Self::account_record).collect();
        let entry_rows: Vec<NewEntryRecord> =
            changes.entries.iter().map(Self::entry_record).collect();

        conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
            for (market, outcome_rows) in &market_rows {
                diesel::replace_into(markets::table)
                    .values(market)
                    .execute(conn)?;
                for outcome in outcome_rows {
                    diesel::replace_into(outcomes::table)
                        .values(outcome)
                        .execute(conn)?;
                }
            }
            for account in &account_rows {
                diesel::replace_into(accounts::table)
                    .values(account)
                    .execute(conn)?;
            }
            for wager in &wager_rows {
                diesel::replace_into(wagers::table)
                    .values(wager)
                    .execute(conn)?;
            }
            for entry in &entry_rows {
                diesel::insert_into(ledger_entries::table)
                    .values(entry)
                    .execute(conn)?;
            }
            Ok(())
        })
        .map_err(|e| Error::Database(e.to_string()))
    }
}

impl LedgerStore for SqliteStore {
    fn commit(&self, changes: &Changeset) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        Self::write(&mut conn, changes)?;
        debug!(
            markets = changes.markets.len(),
            accounts = changes.accounts.len(),
            entries = changes.entries.len(),
            wagers = changes.wagers.len(),
            "changeset committed"
        );
        Ok(())
    }

    fn load(&self) -> Result<Snapshot> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let market_rows: Vec<MarketRecord> = markets::table
            .order(markets::created_at.asc())
            .select(MarketRecord::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let outcome_rows: Vec<OutcomeRecord> = outcomes::table
            .order((outcomes::market_id.asc(), outcomes::position.asc()))
            .select(OutcomeRecord::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let wager_rows: Vec<WagerRecord> = wagers::table
            .order(wagers::placed_at.asc())
            .select(WagerRecord::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let account_rows: Vec<AccountRecord> = accounts::table
            .select(AccountRecord::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let entry_rows: Vec<EntryRecord> = ledger_entries::table
            .order(ledger_entries::seq.asc())
            .select(EntryRecord::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut outcomes_by_market: HashMap<String, Vec<OutcomeRecord>> = HashMap::new();
        for outcome in outcome_rows {
            outcomes_by_market
                .entry(outcome.market_id.clone())
                .or_default()
                .push(outcome);
        }

        let markets = market_rows
            .into_iter()
            .map(|record| {
                let outcome_records = outcomes_by_market.remove(&record.id).unwrap_or_default();
                Self::market_from_records(record, outcome_records)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot {
            markets,
            wagers: wager_rows
                .into_iter()
                .map(Self::wager_from_record)
                .collect::<Result<Vec<_>>>()?,
            accounts: account_rows
                .into_iter()
                .map(Self::account_from_record)
                .collect::<Result<Vec<_>>>()?,
            entries: entry_rows
                .into_iter()
                .map(Self::entry_from_record)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Parse(e.to_string()))?
        .with_timezone(&Utc))
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|e| Error::Parse(e.to_string()))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|e| Error::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
    use crate::domain::{NewMarket, NewOutcome};
    use chrono::Duration;

    fn store() -> SqliteStore {
        let pool = create_pool(":memory:", 1, std::time::Duration::from_millis(100)).unwrap();
        run_migrations(&pool).unwrap();
        SqliteStore::new(pool)
    }

    fn market() -> Market {
        let definition = NewMarket::try_new(
            MarketId::new("m1"),
            "Will the cafeteria serve tacos?",
            "Friday lunch",
            Utc::now() + Duration::days(2),
            vec![
                NewOutcome::new("m1-yes", "Yes", 0.6),
                NewOutcome::new("m1-no", "No", 0.4),
            ],
        )
        .unwrap();
        Market::open(definition, Utc::now())
    }

    fn yes_no(id: &str, yes: f64) -> Market {
        let definition = NewMarket::try_new(
            MarketId::new(id),
            "Yes or no?",
            "",
            Utc::now() + Duration::days(2),
            vec![
                NewOutcome::new("yes", "Yes", yes),
                NewOutcome::new("no", "No", 1.0 - yes),
            ],
        )
        .unwrap();
        Market::open(definition, Utc::now())
    }

    #[test]
    fn market_round_trips_with_outcome_order() {
        let store = store();
        let market = market();
        store.commit(&Changeset::market(market.clone())).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.markets.len(), 1);
        let loaded = &snapshot.markets[0];
        assert_eq!(loaded.id, market.id);
        assert_eq!(loaded.outcomes[0].id, OutcomeId::from("m1-yes"));
        assert_eq!(loaded.outcomes[1].current_probability, market.outcomes[1].current_probability);
        assert_eq!(loaded.status, MarketStatus::Open);
    }

    #[test]
    fn outcome_ids_are_scoped_to_their_market() {
        let store = store();
        let mut first = yes_no("m1", 0.7);
        first.outcomes[0].total_pool = 100;
        store.commit(&Changeset::market(first.clone())).unwrap();
        store.commit(&Changeset::market(yes_no("m2", 0.2))).unwrap();

        let snapshot = store.load().unwrap();
        let loaded = snapshot.markets.iter().find(|m| m.id == first.id).unwrap();
        assert_eq!(loaded.outcomes, first.outcomes);
        let other = snapshot.markets.iter().find(|m| m.id == MarketId::new("m2")).unwrap();
        assert_eq!(other.outcomes.len(), 2);
        assert_eq!(other.outcomes[0].initial_probability, 0.2);
    }

    #[test]
    fn upsert_replaces_market_row() {
        let store = store();
        let mut market = market();
        store.commit(&Changeset::market(market.clone())).unwrap();

        market.status = MarketStatus::Closed;
        market.outcomes[0].total_pool = 25;
        store.commit(&Changeset::market(market)).unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.markets.len(), 1);
        assert_eq!(snapshot.markets[0].status, MarketStatus::Closed);
        assert_eq!(snapshot.markets[0].outcomes[0].total_pool, 25);
    }

    #[test]
    fn duplicate_entry_rolls_back_whole_changeset() {
        let store = store();
        let now = Utc::now();
        let entry = LedgerEntry {
            id: EntryId::generate(),
            user_id: UserId::from("alice"),
            kind: EntryKind::SignupBonus,
            amount: 1000,
            balance_after: 1000,
            reference: None,
            description: "Signup bonus".into(),
            created_at: now,
        };
        let account = AccountRow {
            user_id: UserId::from("alice"),
            balance: 1000,
            created_at: now,
            last_bonus_at: None,
        };
        store
            .commit(&Changeset {
                accounts: vec![account.clone()],
                entries: vec![entry.clone()],
                ..Changeset::default()
            })
            .unwrap();

        let replay = Changeset {
            markets: vec![market()],
            accounts: vec![AccountRow {
                balance: 2000,
                ..account
            }],
            entries: vec![entry],
            ..Changeset::default()
        };
        assert!(store.commit(&replay).is_err());

        let snapshot = store.load().unwrap();
        assert!(snapshot.markets.is_empty());
        assert_eq!(snapshot.accounts[0].balance, 1000);
        assert_eq!(snapshot.entries.len(), 1);
    }

    #[test]
    fn settled_wager_keeps_paid_amount() {
        let store = store();
        let wager = Wager {
            id: WagerId::generate(),
            user_id: UserId::from("bob"),
            market_id: MarketId::new("m1"),
            outcome_id: OutcomeId::from("m1-yes"),
            amount: 100,
            odds_at_purchase: 0.5,
            potential_payout: 200,
            balance_before: 1000,
            placed_at: Utc::now(),
            settlement: WagerSettlement::Won { paid: 200 },
        };
        store
            .commit(&Changeset {
                wagers: vec![wager.clone()],
                ..Changeset::default()
            })
            .unwrap();

        let loaded = store.load().unwrap().wagers.remove(0);
        assert_eq!(loaded.settlement, WagerSettlement::Won { paid: 200 });
        assert_eq!(loaded.id, wager.id);
    }
}

//! User accounts and the append-only credit ledger.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::id::{EntryId, UserId};
use super::Credits;

/// Kind of balance change recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    SignupBonus,
    MonthlyBonus,
    BetPlaced,
    BetWon,
    BetRefund,
}

impl EntryKind {
    /// Stable snake_case name used for persistence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignupBonus => "signup_bonus",
            Self::MonthlyBonus => "monthly_bonus",
            Self::BetPlaced => "bet_placed",
            Self::BetWon => "bet_won",
            Self::BetRefund => "bet_refund",
        }
    }

    /// Parse the persisted name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signup_bonus" => Some(Self::SignupBonus),
            "monthly_bonus" => Some(Self::MonthlyBonus),
            "bet_placed" => Some(Self::BetPlaced),
            "bet_won" => Some(Self::BetWon),
            "bet_refund" => Some(Self::BetRefund),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub kind: EntryKind,
    /// Signed: debits are negative.
    pub amount: Credits,
    pub balance_after: Credits,
    /// Wager or market the change belongs to, if any.
    pub reference: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted account columns, without history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub user_id: UserId,
    pub balance: Credits,
    pub created_at: DateTime<Utc>,
    pub last_bonus_at: Option<DateTime<Utc>>,
}

/// A user's credit balance and its ledger history.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    row: AccountRow,
    history: Vec<LedgerEntry>,
}

impl Account {
    /// Rebuild an account from its persisted parts.
    #[must_use]
    pub fn from_parts(row: AccountRow, history: Vec<LedgerEntry>) -> Self {
        Self { row, history }
    }

    /// Start an empty, zero-balance account. Funding happens via ledger entries.
    #[must_use]
    pub fn empty(user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            row: AccountRow {
                user_id,
                balance: 0,
                created_at,
                last_bonus_at: None,
            },
            history: Vec::new(),
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.row.user_id
    }

    #[must_use]
    pub const fn balance(&self) -> Credits {
        self.row.balance
    }

    #[must_use]
    pub const fn row(&self) -> &AccountRow {
        &self.row
    }

    /// Ledger entries, oldest first.
    #[must_use]
    pub fn history(&self) -> &[LedgerEntry] {
        &self.history
    }

    /// The monthly bonus may be claimed once per UTC calendar month.
    #[must_use]
    pub fn monthly_bonus_available(&self, now: DateTime<Utc>) -> bool {
        match self.row.last_bonus_at {
            None => true,
            Some(last) => last < month_start(now),
        }
    }

    /// Build the entry that would move this account's balance from `running`
    /// by `amount`. Returns `None` if the result would be negative.
    #[must_use]
    pub fn draft_entry(
        &self,
        running: Credits,
        kind: EntryKind,
        amount: Credits,
        reference: Option<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Option<LedgerEntry> {
        let balance_after = running.checked_add(amount)?;
        if balance_after < 0 {
            return None;
        }
        Some(LedgerEntry {
            id: EntryId::generate(),
            user_id: self.row.user_id.clone(),
            kind,
            amount,
            balance_after,
            reference,
            description: description.into(),
            created_at,
        })
    }

    /// The row this account will have once `entries` are applied.
    #[must_use]
    pub fn projected<'a>(&self, entries: impl IntoIterator<Item = &'a LedgerEntry>) -> AccountRow {
        let mut row = self.row.clone();
        for entry in entries {
            if entry.user_id != row.user_id {
                continue;
            }
            row.balance = entry.balance_after;
            if entry.kind == EntryKind::MonthlyBonus {
                row.last_bonus_at = Some(entry.created_at);
            }
        }
        row
    }

    /// Record an entry that has already been persisted.
    pub fn apply(&mut self, entry: LedgerEntry) {
        debug_assert_eq!(entry.user_id, self.row.user_id);
        self.row.balance = entry.balance_after;
        if entry.kind == EntryKind::MonthlyBonus {
            self.row.last_bonus_at = Some(entry.created_at);
        }
        self.history.push(entry);
    }
}

/// First instant of the UTC month containing `now`.
#[must_use]
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

//! Ledger rows read from and written to monthly tabs, and the transactions built from them.

use crate::model::columns::{LEDGER, LEDGER_WIDTH};
use crate::model::{cell, parse_any_date, Amount, RawCell, RawRow, YearMonth, Zone};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Whether money went out or came in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[serde(alias = "지출")]
    Expense,
    #[serde(alias = "입금")]
    Income,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

/// The words written in the type column of the sheet for each `TransactionType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    expense: String,
    income: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            expense: "지출".to_string(),
            income: "입금".to_string(),
        }
    }
}

impl Labels {
    pub fn new(expense: impl Into<String>, income: impl Into<String>) -> Self {
        Self {
            expense: expense.into().trim().to_string(),
            income: income.into().trim().to_string(),
        }
    }

    /// Replaces either label when an override is given, as the HTTP routes allow.
    pub fn with_overrides(&self, expense: Option<&str>, income: Option<&str>) -> Self {
        let pick = |o: Option<&str>, d: &str| {
            o.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(d)
                .to_string()
        };
        Self {
            expense: pick(expense, &self.expense),
            income: pick(income, &self.income),
        }
    }

    pub fn expense(&self) -> &str {
        &self.expense
    }

    pub fn income(&self) -> &str {
        &self.income
    }

    /// Exact match after trimming. Anything else is unclassified.
    pub fn classify(&self, label: &str) -> Option<TransactionType> {
        let label = label.trim();
        if label == self.expense {
            Some(TransactionType::Expense)
        } else if label == self.income {
            Some(TransactionType::Income)
        } else {
            None
        }
    }

    pub fn label(&self, kind: TransactionType) -> &str {
        match kind {
            TransactionType::Expense => &self.expense,
            TransactionType::Income => &self.income,
        }
    }
}

/// Household members and the rule that attributes a card to one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owners {
    names: Vec<String>,
    fallback: String,
}

impl Default for Owners {
    fn default() -> Self {
        Self {
            names: vec!["성욱".to_string(), "회진".to_string()],
            fallback: "회진".to_string(),
        }
    }
}

impl Owners {
    pub fn new(names: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            names,
            fallback: fallback.into(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// The first owner whose name appears in the card label, else the fallback owner.
    pub fn infer(&self, card: &str) -> String {
        self.names
            .iter()
            .find(|name| !name.is_empty() && card.contains(name.as_str()))
            .unwrap_or(&self.fallback)
            .clone()
    }
}

/// A transaction as submitted by a user, before it has an id or an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    pub date: NaiveDate,
    pub amount: Amount,
    pub card: String,
    pub category: String,
    #[serde(default)]
    pub note: String,
}

impl TransactionInput {
    /// The ledger row written for this input. The amount stays numeric and the date is written
    /// as `YYYY-MM-DD` so that the spreadsheet recognizes both.
    pub fn to_row(&self, labels: &Labels) -> RawRow {
        let mut row = vec![RawCell::Empty; LEDGER_WIDTH];
        row[LEDGER.kind] = labels.label(self.kind).into();
        row[LEDGER.category] = self.category.trim().into();
        row[LEDGER.amount] = self.amount.to_f64().into();
        row[LEDGER.date] = self.date.format("%Y-%m-%d").to_string().into();
        row[LEDGER.description] = self.description.trim().into();
        row[LEDGER.card] = self.card.trim().into();
        row[LEDGER.note] = self.note.trim().into();
        row
    }

    /// The month tab this input belongs to.
    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// One normalized row of a ledger tab. The type label is kept as written so that rows with an
/// unexpected label can still be reported; amount and date are `None` when they do not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// The 1-based row number in the sheet.
    pub row: usize,
    #[serde(rename = "type")]
    pub label: String,
    pub category: String,
    pub amount: Option<Amount>,
    pub date: Option<DateTime<FixedOffset>>,
    pub description: String,
    pub card: String,
    pub note: String,
}

impl LedgerEntry {
    pub fn from_row(row_number: usize, row: &[RawCell], zone: &Zone) -> Self {
        Self {
            row: row_number,
            label: cell(row, LEDGER.kind).text(),
            category: cell(row, LEDGER.category).text(),
            amount: Amount::from_cell(cell(row, LEDGER.amount)),
            date: parse_any_date(cell(row, LEDGER.date), zone),
            description: cell(row, LEDGER.description).text(),
            card: cell(row, LEDGER.card).text(),
            note: cell(row, LEDGER.note).text(),
        }
    }

    /// Normalizes the rows of a ledger tab. The first row is the header. Rows where every cell is
    /// blank are skipped.
    pub fn from_rows(rows: &[RawRow], zone: &Zone) -> Vec<Self> {
        rows.iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| !row.iter().all(RawCell::is_blank))
            .map(|(ix, row)| Self::from_row(ix + 1, row, zone))
            .collect()
    }

    /// The calendar day of the entry in the zone it was parsed in.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date_naive())
    }

    /// Amount and date, when both parsed.
    pub fn amount_and_date(&self) -> Option<(Amount, DateTime<FixedOffset>)> {
        match (self.amount, self.date) {
            (Some(amount), Some(date)) => Some((amount, date)),
            _ => {
                trace!("Dropping row {} without a usable amount or date", self.row);
                None
            }
        }
    }
}

/// A transaction as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    pub date: DateTime<FixedOffset>,
    pub amount: Amount,
    pub card: String,
    pub category: String,
    pub owner: String,
}

impl TransactionView {
    pub fn from_input(id: String, input: &TransactionInput, owners: &Owners, zone: &Zone) -> Self {
        Self {
            id,
            kind: input.kind,
            description: input.description.trim().to_string(),
            date: zone.midnight(input.date),
            amount: input.amount,
            card: input.card.trim().to_string(),
            category: input.category.trim().to_string(),
            owner: owners.infer(&input.card),
        }
    }

    /// Builds a view from a sheet row. Rows with an unclassified label, or without a usable
    /// amount or date, have no view.
    pub fn from_entry(tab: &str, entry: &LedgerEntry, labels: &Labels, owners: &Owners) -> Option<Self> {
        let kind = labels.classify(&entry.label)?;
        let (amount, date) = entry.amount_and_date()?;
        Some(Self {
            id: format!("{tab}:{}", entry.row),
            kind,
            description: entry.description.clone(),
            date,
            amount,
            card: entry.card.clone(),
            category: entry.category.clone(),
            owner: owners.infer(&entry.card),
        })
    }

    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

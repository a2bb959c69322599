//! Fixed column layouts of the tabs we read. Rows are positional, so every reader goes through one
//! of these tables instead of hard-coding indexes.

use crate::model::{cell, RawCell};
use serde::{Deserialize, Serialize};

/// Column positions of a monthly ledger tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerColumns {
    pub kind: usize,
    pub category: usize,
    pub amount: usize,
    pub date: usize,
    pub description: usize,
    pub card: usize,
    pub note: usize,
}

/// `A=type, B=category, C=amount, D=date, E=description, F=card, G=note`
pub const LEDGER: LedgerColumns = LedgerColumns {
    kind: 0,
    category: 1,
    amount: 2,
    date: 3,
    description: 4,
    card: 5,
    note: 6,
};

/// The range read from a ledger tab, header included.
pub const LEDGER_RANGE: &str = "A:G";

/// The number of columns written when appending to a ledger tab.
pub const LEDGER_WIDTH: usize = 7;

/// Header row of a ledger tab created by this program.
pub const LEDGER_HEADER: [&str; LEDGER_WIDTH] =
    ["유형", "카테고리", "금액", "날짜", "내용", "결제수단", "비고"];

/// Column positions of a category-budget tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryColumns {
    pub name: usize,
    pub id: usize,
    pub budget: usize,
}

/// `A=name, B=id, C=budget`
pub const CATEGORY: CategoryColumns = CategoryColumns {
    name: 0,
    id: 1,
    budget: 2,
};

/// One row of a category-budget tab. Cells that are missing or not numeric come out as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub name: Option<String>,
    pub id: Option<f64>,
    pub budget: Option<f64>,
}

impl CategoryRow {
    pub fn from_row(row: &[RawCell]) -> Self {
        let name = cell(row, CATEGORY.name);
        Self {
            name: (!name.is_blank()).then(|| name.text()),
            id: cell(row, CATEGORY.id).as_number(),
            budget: cell(row, CATEGORY.budget).as_number(),
        }
    }

    /// Skips the header row and rows with no cells at all.
    pub fn from_rows(rows: &[Vec<RawCell>]) -> Vec<Self> {
        rows.iter()
            .skip(1)
            .filter(|r| !r.is_empty())
            .map(|r| Self::from_row(r))
            .collect()
    }
}

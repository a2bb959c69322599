//! Raw cell values as they cross the spreadsheet boundary.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A single cell as returned by (or sent to) the spreadsheet API. The API hands us strings when
/// values are formatted and numbers when they are not, and it omits trailing empty cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

/// One row of cells, in column order.
pub type RawRow = Vec<RawCell>;

static EMPTY: RawCell = RawCell::Empty;

impl RawCell {
    /// True for `Empty` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Number(_) => false,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Empty => true,
        }
    }

    /// The trimmed text of the cell. Numbers are rendered, `Empty` is an empty string.
    pub fn text(&self) -> String {
        match self {
            RawCell::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    /// The cell as a plain number. Text must parse as a number in full, no decoration is stripped.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawCell::Number(n) if n.is_finite() => Some(*n),
            RawCell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl Display for RawCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RawCell::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            RawCell::Number(n) => write!(f, "{n}"),
            RawCell::Text(s) => f.write_str(s),
            RawCell::Empty => Ok(()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl From<String> for RawCell {
    fn from(value: String) -> Self {
        RawCell::Text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

impl From<i64> for RawCell {
    fn from(value: i64) -> Self {
        RawCell::Number(value as f64)
    }
}

impl<T: Into<RawCell>> From<Option<T>> for RawCell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Returns the cell at `index`, or `Empty` when the row is shorter than that.
pub fn cell(row: &[RawCell], index: usize) -> &RawCell {
    row.get(index).unwrap_or(&EMPTY)
}

/// Builds a `RawRow` from anything that converts into cells.
pub fn raw_row<C, I>(cells: I) -> RawRow
where
    C: Into<RawCell>,
    I: IntoIterator<Item = C>,
{
    cells.into_iter().map(Into::into).collect()
}

//! A small A1-notation reader so that the local and in-memory sheets honor cell ranges the way the
//! Sheets API does.

use crate::error::Res;
use crate::model::{RawCell, RawRow};
use anyhow::{bail, Context};

/// A rectangular selection. Indexes are zero-based and inclusive, `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct A1Range {
    first_col: usize,
    last_col: Option<usize>,
    first_row: usize,
    last_row: Option<usize>,
}

impl A1Range {
    /// Parses forms like `A:G`, `A1:E10`, `B2`, and `A2:C`.
    pub(crate) fn parse(s: &str) -> Res<Self> {
        let s = s.trim();
        let (start, end) = match s.split_once(':') {
            Some((start, end)) => (start, end),
            None => (s, s),
        };
        let (c1, r1) = endpoint(start).with_context(|| format!("Invalid range '{s}'"))?;
        let (c2, r2) = endpoint(end).with_context(|| format!("Invalid range '{s}'"))?;
        Ok(Self {
            first_col: c1.unwrap_or(0),
            last_col: c2,
            first_row: r1.unwrap_or(0),
            last_row: r2,
        })
    }

    /// Selects the range from a full tab. Trailing blank cells are removed, as the API does.
    pub(crate) fn apply(&self, rows: &[RawRow]) -> Vec<RawRow> {
        rows.iter()
            .enumerate()
            .filter(|(ix, _)| *ix >= self.first_row && self.last_row.map_or(true, |last| *ix <= last))
            .map(|(_, row)| {
                let mut selected: RawRow = row
                    .iter()
                    .enumerate()
                    .filter(|(ix, _)| {
                        *ix >= self.first_col && self.last_col.map_or(true, |last| *ix <= last)
                    })
                    .map(|(_, cell)| cell.clone())
                    .collect();
                while selected.last().is_some_and(RawCell::is_blank) {
                    selected.pop();
                }
                selected
            })
            .collect()
    }
}

/// Splits `AB12` into a zero-based column and row. Either part may be missing, but not both.
fn endpoint(s: &str) -> Res<(Option<usize>, Option<usize>)> {
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    if letters.is_empty() && digits.is_empty() {
        bail!("Empty range endpoint");
    }
    let col = if letters.is_empty() {
        None
    } else {
        let mut index = 0usize;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                bail!("Unexpected character '{c}' in column '{letters}'");
            }
            index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
        }
        Some(index - 1)
    };
    let row = if digits.is_empty() {
        None
    } else {
        let n: usize = digits
            .parse()
            .with_context(|| format!("Invalid row number '{digits}'"))?;
        if n == 0 {
            bail!("Row numbers start at 1");
        }
        Some(n - 1)
    };
    Ok((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::raw_row;

    fn tab() -> Vec<RawRow> {
        vec![
            raw_row(["a1", "b1", "c1", "d1"]),
            raw_row(["a2", "b2", "", ""]),
            raw_row(["a3", "b3", "c3", "d3"]),
        ]
    }

    #[test]
    fn test_columns_only() {
        let range = A1Range::parse("A:B").unwrap();
        let rows = range.apply(&tab());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], raw_row(["a3", "b3"]));
    }

    #[test]
    fn test_box() {
        let range = A1Range::parse("B2:C3").unwrap();
        assert_eq!(range.apply(&tab()), vec![raw_row(["b2"]), raw_row(["b3", "c3"])]);
    }

    #[test]
    fn test_open_ended_rows() {
        let range = A1Range::parse("A2:C").unwrap();
        let rows = range.apply(&tab());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], raw_row(["a2", "b2"]));
    }

    #[test]
    fn test_single_cell_and_wide_columns() {
        assert_eq!(A1Range::parse("D3").unwrap().apply(&tab()), vec![raw_row(["d3"])]);
        let wide = A1Range::parse("AA1:ZZ").unwrap();
        assert_eq!(wide.first_col, 26);
    }

    #[test]
    fn test_invalid() {
        assert!(A1Range::parse("").is_err());
        assert!(A1Range::parse("A0").is_err());
        assert!(A1Range::parse("A-1").is_err());
    }
}

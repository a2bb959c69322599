//! Implements the `Sheet` trait using in-memory data for testing purposes.

use crate::api::{A1Range, Sheet, SheetRange};
use crate::error::Res;
use crate::model::{RawCell, RawRow};
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

/// The tabs held by a `TestSheet` and a switch that makes appends fail.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSheetState {
    pub(crate) tabs: HashMap<String, Vec<RawRow>>,
    pub(crate) fail_appends: bool,
    pub(crate) fail_reads: bool,
}

/// An implementation of the `Sheet` trait that does not use Google sheets. Clones share their
/// state, so a test can keep one handle and give another to the code under test.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestSheet {
    state: Arc<Mutex<TestSheetState>>,
}

impl TestSheet {
    /// Seeds `tab` from CSV text. Numeric fields become number cells and empty fields become
    /// empty cells.
    pub(crate) fn with_csv(self, tab: &str, csv_data: &str) -> Self {
        let rows = load_csv(csv_data).unwrap();
        self.state().tabs.insert(tab.to_string(), rows);
        self
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, TestSheetState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn rows(&self, tab: &str) -> Vec<RawRow> {
        self.state().tabs.get(tab).cloned().unwrap_or_default()
    }

    pub(crate) fn set_fail_appends(&self, fail: bool) {
        self.state().fail_appends = fail;
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self, range: &SheetRange) -> Res<Vec<RawRow>> {
        let state = self.state();
        if state.fail_reads {
            bail!("The caller does not have permission");
        }
        let rows = state
            .tabs
            .get(range.tab())
            .with_context(|| format!("Sheet '{}' not found", range.tab()))?;
        match range.range() {
            Some(a1) => Ok(A1Range::parse(a1)?.apply(rows)),
            None => Ok(rows.clone()),
        }
    }

    async fn append(&mut self, tab: &str, row: &RawRow) -> Res<()> {
        let mut state = self.state();
        if state.fail_appends {
            bail!("Append to {tab} failed with status 503 Service Unavailable");
        }
        let rows = state
            .tabs
            .get_mut(tab)
            .with_context(|| format!("Unable to parse range: {tab}"))?;
        rows.push(row.clone());
        Ok(())
    }
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Res<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<RawRow> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(csv_cell).collect());
    }
    Ok(rows)
}

fn csv_cell(field: &str) -> RawCell {
    if field.is_empty() {
        RawCell::Empty
    } else if let Ok(n) = field.parse::<f64>() {
        RawCell::Number(n)
    } else {
        RawCell::Text(field.to_string())
    }
}

/// A September ledger in the shape household members keep it: decorated amounts, mixed date
/// formats, a serial date, a transfer row and a row with no usable date.
pub(crate) const SEPTEMBER: &str = r##"유형,카테고리,금액,날짜,내용,결제수단,비고
지출,식비,"₩15,000",2025-09-07,점심 식사,회진카카오체크,
지출,운동,50000,2025. 9. 6,헬스장 회비,성욱현금,
입금,기타,"3,000,000원",45901,월급,회진현금,
지출,식비,8000,N/A,커피,성욱현금,
이체,기타,100000,2025-09-07,저축,회진현금,
지출,교통비,"1,250",2025-09-07T08:10:00+09:00,버스,회진현금,출근
"##;

/// A category-budget tab.
pub(crate) const CATEGORIES: &str = r##"카테고리,ID,예산
식비,1,500000
운동,2,100000
경조사,3,
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_rows() {
        let mut sheet = TestSheet::default().with_csv("9월", SEPTEMBER);
        let rows = sheet.get(&SheetRange::new("9월", Some("A:G"))).await.unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[1][2], RawCell::Text("₩15,000".into()));
        assert_eq!(rows[3][3], RawCell::Number(45901.0));
        assert_eq!(rows[1].len(), 6);
    }

    #[tokio::test]
    async fn test_shared_state_and_failures() {
        let handle = TestSheet::default().with_csv("9월", SEPTEMBER);
        let mut sheet = handle.clone();
        sheet.append("9월", &vec![RawCell::from("지출")]).await.unwrap();
        assert_eq!(handle.rows("9월").len(), 8);

        handle.set_fail_appends(true);
        assert!(sheet.append("9월", &vec![]).await.is_err());
        assert!(sheet.append("10월", &vec![]).await.is_err());
        handle.set_fail_reads(true);
        assert!(sheet.get(&SheetRange::whole("9월")).await.is_err());
    }
}

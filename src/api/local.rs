//! A `Sheet` kept in a JSON file in the budget home directory. It is used when no spreadsheet is
//! configured, or when `BUDGET_SHEET_LOCAL_MODE` is set, so the whole app can run offline.

use crate::api::{A1Range, File, Sheet, SheetRange};
use crate::error::Res;
use crate::model::columns::LEDGER_HEADER;
use crate::model::{raw_row, RawRow};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// The on-disk format: every tab's rows, keyed by tab name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct LocalDocument {
    #[serde(default)]
    pub(crate) budget_transactions: BTreeMap<String, Vec<RawRow>>,
}

pub(crate) struct LocalSheet {
    file: File<LocalDocument>,
}

impl LocalSheet {
    /// Opens the file at `path`. A missing file is an empty spreadsheet.
    pub(crate) async fn open(path: impl Into<PathBuf>) -> Res<Self> {
        let file = File::load_or(path, LocalDocument::default())
            .await
            .context("Unable to open the local sheet file")?;
        Ok(Self { file })
    }

    /// Replaces the rows of `tab` and saves the file.
    pub(crate) async fn put_tab(&mut self, tab: &str, rows: Vec<RawRow>) -> Res<()> {
        self.file
            .data_mut()
            .budget_transactions
            .insert(tab.to_string(), rows);
        self.file.save().await
    }
}

#[async_trait::async_trait]
impl Sheet for LocalSheet {
    async fn get(&mut self, range: &SheetRange) -> Res<Vec<RawRow>> {
        let rows = self
            .file
            .data()
            .budget_transactions
            .get(range.tab())
            .with_context(|| format!("Sheet '{}' not found", range.tab()))?;
        match range.range() {
            Some(a1) => Ok(A1Range::parse(a1)?.apply(rows)),
            None => Ok(rows.clone()),
        }
    }

    async fn append(&mut self, tab: &str, row: &RawRow) -> Res<()> {
        let rows = self
            .file
            .data_mut()
            .budget_transactions
            .entry(tab.to_string())
            .or_insert_with(|| {
                debug!("Creating tab {tab} in the local sheet");
                vec![raw_row(LEDGER_HEADER)]
            });
        rows.push(row.clone());
        self.file
            .save()
            .await
            .with_context(|| format!("Unable to save the local sheet after appending to {tab}"))
    }
}

//! The spreadsheet gateway. Everything that reads or writes sheet tabs goes through the `Sheet`
//! trait so that the Google implementation can be swapped for a local file or, in tests, for
//! in-memory data.

mod auth;
mod files;
mod google;
mod local;
mod range;
#[cfg(test)]
pub(crate) mod test_sheet;

use crate::error::Res;
use crate::model::RawRow;
use crate::Config;
use std::fmt::{Display, Formatter};
use tracing::{debug, warn};

pub(crate) use auth::TokenProvider;
pub(crate) use files::{File, ServiceAccountKey};
pub(crate) use google::GoogleSheet;
pub(crate) use local::LocalSheet;
pub(crate) use range::A1Range;
#[cfg(test)]
pub(crate) use test_sheet::TestSheet;

/// The OAuth scope requested for the service account.
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// When this environment variable is set to a non-empty value the local JSON file is used in place
/// of Google Sheets.
pub const LOCAL_MODE_ENV: &str = "BUDGET_SHEET_LOCAL_MODE";

/// Reads and appends rows of a spreadsheet.
#[async_trait::async_trait]
pub(crate) trait Sheet: Send {
    /// Returns the rows of `range` in order, header row included. Trailing empty cells may be
    /// missing from a row.
    async fn get(&mut self, range: &SheetRange) -> Res<Vec<RawRow>>;

    /// Appends `row` after the last row of the tab named `tab`.
    async fn append(&mut self, tab: &str, row: &RawRow) -> Res<()>;
}

/// A tab name and an optional cell range within it, e.g. `9월` and `A:G`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    tab: String,
    range: Option<String>,
}

impl SheetRange {
    /// A blank `range` means the whole tab.
    pub fn new(tab: impl Into<String>, range: Option<&str>) -> Self {
        Self {
            tab: tab.into(),
            range: range
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        }
    }

    pub fn whole(tab: impl Into<String>) -> Self {
        Self::new(tab, None)
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    /// The range as written in API responses; the whole tab is `(entire sheet)`.
    pub fn range_label(&self) -> &str {
        self.range().unwrap_or("(entire sheet)")
    }

    /// A1 notation with the tab name quoted, so that names with spaces, quotes or Hangul are safe.
    pub fn a1(&self) -> String {
        let quoted = quote_tab(&self.tab);
        match &self.range {
            Some(range) => format!("{quoted}!{range}"),
            None => quoted,
        }
    }
}

impl Display for SheetRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.a1())
    }
}

/// Wraps a tab title in single quotes, doubling any quotes inside it.
pub fn quote_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Which backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Google,
    Local,
}

impl Mode {
    /// `Local` when `BUDGET_SHEET_LOCAL_MODE` is set and non-empty, otherwise `Google`.
    pub fn from_env() -> Self {
        match std::env::var(LOCAL_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Local,
            _ => Mode::Google,
        }
    }
}

/// Creates the gateway for `mode`. Google mode falls back to the local file when no spreadsheet
/// is configured.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Res<Box<dyn Sheet>> {
    match (mode, config.spreadsheet_id()) {
        (Mode::Google, Some(spreadsheet_id)) => {
            debug!("Using Google spreadsheet {spreadsheet_id}");
            let key = ServiceAccountKey::resolve(config).await?;
            let token_provider = TokenProvider::new(key);
            let sheet = GoogleSheet::new(spreadsheet_id, token_provider);
            Ok(Box::new(sheet))
        }
        (Mode::Google, None) => {
            warn!(
                "No spreadsheet is configured, using the local sheet file at {}",
                config.local_sheet_path().display()
            );
            Ok(Box::new(LocalSheet::open(config.local_sheet_path()).await?))
        }
        (Mode::Local, _) => {
            debug!("Using the local sheet file at {}", config.local_sheet_path().display());
            Ok(Box::new(LocalSheet::open(config.local_sheet_path()).await?))
        }
    }
}

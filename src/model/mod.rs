//! Types that represent the core data model: raw cells from the sheet, normalized ledger rows,
//! transactions, the admin configuration and the summaries derived from them.
mod admin;
mod amount;
mod cell;
pub mod columns;
mod date;
mod summary;
mod transaction;

pub use admin::{AdminConfig, AdminConfigPatch};
pub use amount::{Amount, AmountError};
pub use cell::{cell, raw_row, RawCell, RawRow};
pub use columns::CategoryRow;
pub use date::{date_to_serial, parse_any_date, serial_to_date, Period, YearMonth, Zone};
pub use summary::{
    AnalysisResult, CategorySummary, DailySummary, MonthlySummary, UserExpenseSummary,
};
pub use transaction::{
    LedgerEntry, Labels, Owners, TransactionInput, TransactionType, TransactionView,
};

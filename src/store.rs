//! The application store. It owns the sheet gateway, the in-memory transactions of the month
//! being viewed, the admin configuration and the persisted UI selection. Every mutation goes
//! through a method here, and failures carry a fixed `ErrorCode`.

use crate::aggregate;
use crate::analysis::analyze;
use crate::api::{self, File, Mode, Sheet, SheetRange};
use crate::error::{Error, ErrorCode, ErrorType, IntoResult, Res, Result};
use crate::model::columns::LEDGER_RANGE;
use crate::model::{
    AdminConfig, AdminConfigPatch, AnalysisResult, CategorySummary, Labels, LedgerEntry,
    MonthlySummary, Owners, RawRow, TransactionInput, TransactionView, UserExpenseSummary,
    YearMonth, Zone,
};
use crate::{utils, Config};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// The UI selection that survives restarts. Nothing else is persisted in `budget-store.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub selected_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_month: Option<YearMonth>,
}

impl UiState {
    fn new(selected_user: impl Into<String>) -> Self {
        Self {
            selected_user: selected_user.into(),
            selected_month: None,
        }
    }
}

pub struct BudgetStore {
    sheet: Box<dyn Sheet>,
    labels: Labels,
    owners: Owners,
    zone: Zone,
    admin: File<AdminConfig>,
    ui: File<UiState>,
    transactions: Vec<TransactionView>,
}

impl BudgetStore {
    /// Opens the store with the gateway chosen by `mode`.
    pub async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let sheet = api::sheet(config, mode)
            .await
            .context("Unable to create the sheet gateway")
            .pub_result(ErrorType::Sheet)?;
        Self::with_sheet(config, sheet).await
    }

    pub(crate) async fn with_sheet(config: &Config, sheet: Box<dyn Sheet>) -> Result<Self> {
        let admin = File::load_or(config.admin_config_path(), AdminConfig::default())
            .await
            .coded_result(ErrorType::Storage, ErrorCode::GetConfigFailed)?;
        let ui = File::load_or(
            config.ui_state_path(),
            UiState::new(config.owners().fallback()),
        )
        .await
        .pub_result(ErrorType::Storage)?;
        Ok(Self {
            sheet,
            labels: config.labels().clone(),
            owners: config.owners().clone(),
            zone: config.zone().clone(),
            admin,
            ui,
            transactions: Vec::new(),
        })
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn owners(&self) -> &Owners {
        &self.owners
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn transactions(&self) -> &[TransactionView] {
        &self.transactions
    }

    pub fn admin_config(&self) -> &AdminConfig {
        self.admin.data()
    }

    /// The tab that new rows are appended to, named after the current calendar month.
    pub fn append_tab(&self) -> String {
        YearMonth::current(&self.zone).tab_name()
    }

    /// Reads raw rows from the sheet.
    pub async fn read(&mut self, range: &SheetRange) -> Result<Vec<RawRow>> {
        self.read_rows(range).await.pub_result(ErrorType::Sheet)
    }

    /// Appends `row` as-is to the current month tab and returns the tab name.
    pub async fn append_row(&mut self, row: &RawRow) -> Result<String> {
        let tab = self.append_tab();
        self.sheet
            .append(&tab, row)
            .await
            .with_context(|| format!("Unable to append a row to {tab}"))
            .pub_result(ErrorType::Sheet)?;
        Ok(tab)
    }

    /// Writes `input` to the current month tab. Only after the write succeeds is the new
    /// transaction added to memory, so a failure leaves the loaded transactions as they were.
    pub async fn add_transaction(&mut self, input: TransactionInput) -> Result<TransactionView> {
        let tab = self.append_tab();
        let row = input.to_row(&self.labels);
        self.sheet
            .append(&tab, &row)
            .await
            .with_context(|| format!("Unable to save the transaction to {tab}"))
            .coded_result(ErrorType::Sheet, ErrorCode::SaveTransactionFailed)?;

        let view = TransactionView::from_input(utils::generate_id(), &input, &self.owners, &self.zone);
        info!(
            "Saved {} of {} in {tab} for {}",
            view.kind, view.amount, view.owner
        );
        self.transactions.push(view.clone());
        Ok(view)
    }

    /// Replaces the in-memory transactions with those of `month` (the selected month when
    /// `None`). On failure the previous transactions are kept.
    pub async fn load_transactions(&mut self, month: Option<YearMonth>) -> Result<&[TransactionView]> {
        let month = month.unwrap_or_else(|| self.selected_month());
        let tab = month.tab_name();
        let rows = self
            .read_rows(&SheetRange::new(&tab, Some(LEDGER_RANGE)))
            .await
            .coded_result(ErrorType::Sheet, ErrorCode::GetTransactionsFailed)?;

        let entries = LedgerEntry::from_rows(&rows, &self.zone);
        let transactions: Vec<TransactionView> = entries
            .iter()
            .filter_map(|e| TransactionView::from_entry(&tab, e, &self.labels, &self.owners))
            .filter(|t| t.month() == month)
            .collect();
        debug!(
            "Loaded {} of {} rows from {tab} as transactions of {month}",
            transactions.len(),
            entries.len()
        );
        self.transactions = transactions;
        Ok(&self.transactions)
    }

    /// Re-reads the admin configuration from disk.
    pub async fn load_admin_config(&mut self) -> Result<&AdminConfig> {
        self.admin = load_admin(self.admin.path().to_path_buf()).await?;
        Ok(self.admin.data())
    }

    /// Merges `patch` into the stored configuration and saves it. When `expected_version` is
    /// given and the stored version differs, nothing is written and `CONFIG_VERSION_CONFLICT`
    /// is returned.
    pub async fn update_admin_config(
        &mut self,
        patch: AdminConfigPatch,
        expected_version: Option<u64>,
    ) -> Result<AdminConfig> {
        let mut file = load_admin(self.admin.path().to_path_buf()).await?;
        let stored_version = file.data().version;
        if let Some(expected) = expected_version.filter(|v| *v != stored_version) {
            return Err(Error::new(
                ErrorType::Conflict,
                anyhow!("The admin config is at version {stored_version}, not {expected}"),
            )
            .with_code(ErrorCode::ConfigVersionConflict));
        }

        let updated = file.data().apply(patch);
        file.set(updated);
        file.save()
            .await
            .coded_result(ErrorType::Storage, ErrorCode::SaveConfigFailed)?;
        info!("Saved admin config version {}", file.data().version);
        self.admin = file;
        Ok(self.admin.data().clone())
    }

    pub fn selected_user(&self) -> &str {
        &self.ui.data().selected_user
    }

    /// The selected month, or the current month when none has been selected.
    pub fn selected_month(&self) -> YearMonth {
        self.ui
            .data()
            .selected_month
            .unwrap_or_else(|| YearMonth::current(&self.zone))
    }

    pub async fn set_selected_user(&mut self, user: impl Into<String>) -> Result<()> {
        self.ui.data_mut().selected_user = user.into();
        self.ui.save().await.pub_result(ErrorType::Storage)
    }

    pub async fn set_selected_month(&mut self, month: YearMonth) -> Result<()> {
        self.ui.data_mut().selected_month = Some(month);
        self.ui.save().await.pub_result(ErrorType::Storage)
    }

    /// Loaded transactions in the selected month.
    pub fn current_month_transactions(&self) -> Vec<&TransactionView> {
        aggregate::in_month(&self.transactions, self.selected_month())
    }

    /// Loaded transactions in the selected month that belong to `user`.
    pub fn transactions_by_user(&self, user: &str) -> Vec<&TransactionView> {
        self.current_month_transactions()
            .into_iter()
            .filter(|t| t.owner == user)
            .collect()
    }

    /// Totals for `month`, defaulting to the selected month. `None` when the month has no
    /// loaded transactions.
    pub fn monthly_summary(&self, month: Option<YearMonth>) -> Option<MonthlySummary> {
        aggregate::monthly_summary(&self.transactions, self.month_or_selected(month))
    }

    pub fn category_summary(&self, month: Option<YearMonth>) -> Vec<CategorySummary> {
        aggregate::category_summary(&self.expenses(month))
    }

    pub fn user_expense_summary(&self, month: Option<YearMonth>) -> Vec<UserExpenseSummary> {
        aggregate::user_expense_summary(&self.expenses(month))
    }

    /// Compares the month's expenses against the admin budgets.
    pub fn generate_analysis(&self, month: Option<YearMonth>) -> AnalysisResult {
        analyze(&self.expenses(month), self.admin.data())
    }

    fn expenses(&self, month: Option<YearMonth>) -> Vec<&TransactionView> {
        aggregate::expenses_in_month(&self.transactions, self.month_or_selected(month))
    }

    fn month_or_selected(&self, month: Option<YearMonth>) -> YearMonth {
        month.unwrap_or_else(|| self.selected_month())
    }

    async fn read_rows(&mut self, range: &SheetRange) -> Res<Vec<RawRow>> {
        self.sheet
            .get(range)
            .await
            .with_context(|| format!("Unable to read {range}"))
    }
}

async fn load_admin(path: PathBuf) -> Result<File<AdminConfig>> {
    File::load_or(path, AdminConfig::default())
        .await
        .coded_result(ErrorType::Storage, ErrorCode::GetConfigFailed)
}

use crate::api::{File, LocalSheet, Sheet, SheetRange};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::columns::LEDGER_HEADER;
use crate::model::{raw_row, AdminConfig, YearMonth};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;
use tracing::debug;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `sheet_url` along with default settings
/// - Copies `service_account` into its default location in the data dir
/// - Writes the admin config, filled with sample budgets when `sample` is set
/// - Without a spreadsheet, creates the local sheet file with an empty tab for the current month
///
/// # Arguments
/// - `budget_home` - The directory that will be the root of data directory, e.g. `$HOME/budget`
/// - `sheet_url` - The URL of the Google Sheet where the ledger is kept, e.g.
///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
/// - `service_account` - A downloaded service account key. It is copied into `.secrets`.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(
    budget_home: &Path,
    sheet_url: Option<&str>,
    service_account: Option<&Path>,
    sample: bool,
) -> Result<Out<()>> {
    let config = Config::create(budget_home, sheet_url, service_account)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;

    let admin = if sample {
        AdminConfig::sample()
    } else {
        AdminConfig::default()
    };
    File::new(config.admin_config_path(), admin)
        .save()
        .await
        .context("Unable to write the admin config")
        .pub_result(ErrorType::Storage)?;

    if config.spreadsheet_id().is_none() {
        create_local_sheet(&config)
            .await
            .context("Unable to create the local sheet file")
            .pub_result(ErrorType::Storage)?;
    }

    Ok("Successfully created the budget directory and config".into())
}

async fn create_local_sheet(config: &Config) -> crate::error::Res<()> {
    let mut sheet = LocalSheet::open(config.local_sheet_path()).await?;
    let tab = YearMonth::current(config.zone()).tab_name();
    if sheet.get(&SheetRange::whole(&tab)).await.is_ok() {
        debug!("The local sheet already has a {tab} tab");
        return Ok(());
    }
    sheet.put_tab(&tab, vec![raw_row(LEDGER_HEADER)]).await
}

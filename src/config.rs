//! Configuration file handling for the budget app.
//!
//! The configuration file is stored at `$BUDGET_HOME/config.json` and contains the Google Sheet
//! URL, the words used in the type column, the household members, the time zone and the address
//! the HTTP server binds to.

use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::model::{Labels, Owners, Zone};
use crate::utils;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "budget";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const SERVICE_ACCOUNT_JSON: &str = "service_account.json";
const CONFIG_JSON: &str = "config.json";
const ADMIN_CONFIG_JSON: &str = "budget_admin_config.json";
const UI_STATE_JSON: &str = "budget-store.json";
const LOCAL_SHEET_JSON: &str = "budget_transactions.json";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Overrides the spreadsheet id taken from `sheet_url`.
pub const SPREADSHEET_ID_ENV: &str = "GOOGLE_SHEETS_SPREADSHEET_ID";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BUDGET_HOME` and from there it loads `$BUDGET_HOME/config.json`. It provides
/// paths to other items that are expected in a certain location within the budget home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: Option<String>,
}

impl Config {
    /// Creates the data directory, its secrets subdirectory and:
    /// - Creates an initial `config.json` file using `sheet_url` along with default settings
    /// - Copies `service_account` into its default location in the data dir.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/budget`
    /// - `sheet_url` - The URL of the Google Sheet that holds the ledger. Without one the app runs
    ///   against the local sheet file.
    /// - `service_account` - A downloaded service account key file. It is copied, not moved.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or the sheet URL is malformed.
    pub async fn create(
        dir: impl Into<PathBuf>,
        sheet_url: Option<&str>,
        service_account: Option<&Path>,
    ) -> Res<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the budget home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        if let Some(key_file) = service_account {
            utils::copy(key_file, secrets.join(SERVICE_ACCOUNT_JSON)).await?;
        }

        let config_file = ConfigFile {
            sheet_url: sheet_url.unwrap_or_default().trim().to_string(),
            ..ConfigFile::default()
        };
        let config_path = root.join(CONFIG_JSON);
        config_file.save(&config_path).await?;

        Self::from_parts(root, config_path, config_file)
    }

    /// This will
    /// - validate that `budget_home` and its config file exist
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(budget_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_home(budget_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_home(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Budget Home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let config = Self::from_parts(root, config_path, config_file)?;
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    fn from_parts(root: PathBuf, config_path: PathBuf, config_file: ConfigFile) -> Res<Self> {
        let spreadsheet_id = resolve_spreadsheet_id(
            std::env::var(SPREADSHEET_ID_ENV).ok(),
            &config_file.sheet_url,
        )
        .context("Failed to extract spreadsheet ID from sheet URL")?;
        debug!("Spreadsheet id: {spreadsheet_id:?}");
        Ok(Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    /// `None` when neither a sheet URL nor `GOOGLE_SHEETS_SPREADSHEET_ID` is set.
    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id.as_deref()
    }

    pub fn labels(&self) -> &Labels {
        &self.config_file.labels
    }

    pub fn owners(&self) -> &Owners {
        &self.config_file.owners
    }

    pub fn zone(&self) -> &Zone {
        &self.config_file.time_zone
    }

    pub fn bind_address(&self) -> &str {
        &self.config_file.bind_address
    }

    pub fn admin_config_path(&self) -> PathBuf {
        self.root.join(ADMIN_CONFIG_JSON)
    }

    pub fn ui_state_path(&self) -> PathBuf {
        self.root.join(UI_STATE_JSON)
    }

    pub fn local_sheet_path(&self) -> PathBuf {
        self.root.join(LOCAL_SHEET_JSON)
    }

    /// Returns the stored `service_account_path` if it is absolute, otherwise resolves the
    /// relative path against the home directory.
    pub fn service_account_path(&self) -> PathBuf {
        let p = self.config_file.service_account_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "budget",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "labels": { "expense": "지출", "income": "입금" },
///   "owners": { "names": ["성욱", "회진"], "fallback": "회진" },
///   "time_zone": { "name": "Asia/Seoul", "utc_offset_minutes": 540 },
///   "bind_address": "127.0.0.1:3000"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "budget"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL to the Google Sheet. Empty when the local sheet file is used.
    #[serde(default)]
    sheet_url: String,

    #[serde(default)]
    labels: Labels,

    #[serde(default)]
    owners: Owners,

    #[serde(default)]
    time_zone: Zone,

    #[serde(default = "default_bind_address")]
    bind_address: String,

    /// Path to the service account key (optional, relative to config.json or absolute).
    /// Defaults to $BUDGET_HOME/.secrets/service_account.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_account_path: Option<PathBuf>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            labels: Labels::default(),
            owners: Owners::default(),
            time_zone: Zone::default(),
            bind_address: default_bind_address(),
            service_account_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn service_account_path(&self) -> PathBuf {
        self.service_account_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(SERVICE_ACCOUNT_JSON))
    }
}

/// A non-empty override wins; otherwise the id comes from the sheet URL, and an empty URL means
/// no spreadsheet.
fn resolve_spreadsheet_id(env_override: Option<String>, sheet_url: &str) -> Res<Option<String>> {
    if let Some(id) = env_override.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        return Ok(Some(id));
    }
    let id = extract_spreadsheet_id(sheet_url)?;
    Ok((!id.is_empty()).then(|| id.to_string()))
}

/// Extracts the spreadsheet ID from a Google Sheets URL
///
/// # Arguments
/// * `url` - The Google Sheets URL (e.g., "https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...")
///
/// # Returns
/// The spreadsheet ID or an error if the URL format is invalid. Returns an empty string if the URL is empty.
fn extract_spreadsheet_id(url: &str) -> Res<&str> {
    if url.is_empty() {
        return Ok(url);
    }

    // URL format: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/...
    // or: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID?foo=bar
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" && i + 1 < parts.len() {
            let id_part = parts[i + 1];
            let id = id_part
                .split('?')
                .next()
                .unwrap_or(id_part)
                .split('#')
                .next()
                .unwrap_or(id_part);
            return Ok(id);
        }
    }
    Err(anyhow::anyhow!(
        "Invalid Google Sheets URL format. Expected: https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_copies_key() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("budget_home");
        let key_file = dir.path().join("key.json");
        utils::write(&key_file, "12345").await.unwrap();
        let sheet_url = "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";

        let config = Config::create(&home_dir, Some(sheet_url), Some(&key_file))
            .await
            .unwrap();

        assert_eq!(sheet_url, config.sheet_url());
        assert_eq!(
            utils::read(&config.service_account_path()).await.unwrap(),
            "12345"
        );
        assert!(key_file.is_file());
        assert!(config.secrets().is_dir());
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.labels(), &Labels::default());
        assert_eq!(
            config.local_sheet_path().file_name().unwrap(),
            "budget_transactions.json"
        );
    }

    #[tokio::test]
    async fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let created = Config::create(dir.path(), None, None).await.unwrap();
        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(created.config_file, loaded.config_file);
        assert_eq!(loaded.zone().name(), "Asia/Seoul");
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(err.to_string().contains("Budget Home is missing"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let json = r#"{
            "app_name": "budget",
            "config_version": 1,
            "sheet_url": "https://docs.google.com/spreadsheets/d/minimal"
        }"#;
        utils::write(&path, json).await.unwrap();

        let config = ConfigFile::load(&path).await.unwrap();
        assert_eq!(config.sheet_url, "https://docs.google.com/spreadsheets/d/minimal");
        assert_eq!(config.owners, Owners::default());
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.service_account_path(),
            PathBuf::from(SECRETS).join(SERVICE_ACCOUNT_JSON)
        );
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        utils::write(&path, r#"{"app_name": "ledger", "config_version": 1}"#)
            .await
            .unwrap();
        let result = ConfigFile::load(&path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("service_account_path"));
        assert!(json.contains("\"utc_offset_minutes\":540"));
    }

    #[test]
    fn test_resolve_spreadsheet_id() {
        let url = "https://docs.google.com/spreadsheets/d/ABC123/edit";
        assert_eq!(resolve_spreadsheet_id(None, url).unwrap().as_deref(), Some("ABC123"));
        assert_eq!(
            resolve_spreadsheet_id(Some("XYZ".into()), url).unwrap().as_deref(),
            Some("XYZ")
        );
        assert_eq!(
            resolve_spreadsheet_id(Some(" ".into()), url).unwrap().as_deref(),
            Some("ABC123")
        );
        assert_eq!(resolve_spreadsheet_id(None, "").unwrap(), None);
        assert!(resolve_spreadsheet_id(None, "https://example.com/invalid").is_err());
    }

    #[test]
    fn test_extract_spreadsheet_id() {
        let url = "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL?foo=bar";
        let id = extract_spreadsheet_id(url).unwrap();
        assert_eq!(id, "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL");

        let url2 = "https://docs.google.com/spreadsheets/d/ABC123#gid=0";
        assert_eq!(extract_spreadsheet_id(url2).unwrap(), "ABC123");

        assert!(extract_spreadsheet_id("https://example.com/invalid").is_err());
        assert_eq!(extract_spreadsheet_id("").unwrap(), "");
    }
}

//! These structs provide the CLI interface for the budget CLI.

use crate::model::{Amount, TransactionType, YearMonth};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// budget: A household budget tracker backed by a Google sheet.
///
/// Transactions live in monthly tabs of a shared spreadsheet (`9월`, `10월`, ...). This program
/// appends new transactions to the current month, summarizes months by day, category and
/// household member, and compares spending with the budgets kept in a local admin config.
///
/// The `serve` subcommand exposes the same operations as a JSON HTTP API for the web front end.
/// Without a configured spreadsheet everything runs against a local JSON file.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// - Decide what directory you want to store data in and pass this as --budget-home. By
    ///   default, it will be $HOME/budget.
    ///
    /// - Pass the URL of the household Google Sheet as --sheet-url. Without it, transactions are
    ///   kept in a local file instead.
    ///
    /// - Create a Google Cloud service account, share the sheet with its email address and pass
    ///   the downloaded key file as --service-account. The key can also be supplied through the
    ///   GOOGLE_SHEETS_CLIENT_EMAIL and GOOGLE_SHEETS_PRIVATE_KEY environment variables.
    Init(InitArgs),
    /// Serve the JSON HTTP API.
    Serve(ServeArgs),
    /// Append a transaction to the current month's tab.
    Add(AddArgs),
    /// Show the totals of a month, by category and by household member.
    Summary(SummaryArgs),
    /// Compare a month's spending with the configured budgets.
    Analyze(AnalyzeArgs),
    /// Show or change the admin configuration: cards, categories and budgets.
    Admin(AdminArgs),
    /// Remember the selected household member and month between runs.
    Select(SelectArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter documentation.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where budget data and configuration is held. Defaults to ~/budget
    #[arg(long, env = "BUDGET_HOME", default_value_t = default_budget_home())]
    budget_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, budget_home: PathBuf) -> Self {
        Self {
            log_level,
            budget_home: budget_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn budget_home(&self) -> &DisplayPath {
        &self.budget_home
    }
}

/// (Not shown): Args for the `budget init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to the household Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: Option<String>,

    /// The path to a downloaded service account key. This file will be copied to the default
    /// secrets location in the main data directory.
    #[arg(long)]
    service_account: Option<PathBuf>,

    /// Seed the admin config with sample cards, categories and budgets.
    #[arg(long)]
    sample: bool,
}

impl InitArgs {
    pub fn new(sheet_url: Option<String>, service_account: Option<PathBuf>, sample: bool) -> Self {
        Self {
            sheet_url,
            service_account,
            sample,
        }
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    pub fn service_account(&self) -> Option<&Path> {
        self.service_account.as_deref()
    }

    pub fn sample(&self) -> bool {
        self.sample
    }
}

/// (Not shown): Args for the `budget serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The address to listen on, e.g. 0.0.0.0:8080. Defaults to the bind_address in config.json.
    #[arg(long)]
    bind: Option<String>,
}

impl ServeArgs {
    pub fn new(bind: Option<String>) -> Self {
        Self { bind }
    }

    pub fn bind(&self) -> Option<&str> {
        self.bind.as_deref()
    }
}

/// (Not shown): Args for the `budget add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// "expense" or "income" (or the sheet labels 지출 / 입금)
    #[arg(long = "type", default_value_t = TransactionType::Expense)]
    kind: TransactionType,

    /// What the money was spent on or received for.
    #[arg(long)]
    description: String,

    /// The day of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// The amount, e.g. 15000 or "₩15,000".
    #[arg(long)]
    amount: Amount,

    /// The card or payment method. The owner is inferred from it.
    #[arg(long)]
    card: String,

    #[arg(long)]
    category: String,

    #[arg(long, default_value = "")]
    note: String,
}

impl AddArgs {
    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn card(&self) -> &str {
        &self.card
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn note(&self) -> &str {
        &self.note
    }
}

/// (Not shown): Args for the `budget summary` command.
#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    /// The month as YYYY-MM. Defaults to the selected month.
    #[arg(long)]
    month: Option<YearMonth>,

    /// Only list the transactions of this household member.
    #[arg(long)]
    user: Option<String>,
}

impl SummaryArgs {
    pub fn new(month: Option<YearMonth>, user: Option<String>) -> Self {
        Self { month, user }
    }

    pub fn month(&self) -> Option<YearMonth> {
        self.month
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// (Not shown): Args for the `budget analyze` command.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// The month as YYYY-MM. Defaults to the selected month.
    #[arg(long)]
    month: Option<YearMonth>,
}

impl AnalyzeArgs {
    pub fn new(month: Option<YearMonth>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<YearMonth> {
        self.month
    }
}

/// (Not shown): Args for the `budget admin` command.
#[derive(Debug, Parser, Clone)]
pub struct AdminArgs {
    #[command(subcommand)]
    action: AdminSubcommand,
}

impl AdminArgs {
    pub fn action(&self) -> &AdminSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminSubcommand {
    /// Print the admin configuration.
    Show,
    /// Replace parts of the admin configuration. Options that are not given are left as they are.
    Set(AdminSetArgs),
}

/// (Not shown): Args for the `budget admin set` command.
#[derive(Debug, Parser, Clone)]
pub struct AdminSetArgs {
    #[arg(long)]
    monthly_budget: Option<Amount>,

    /// Comma-separated card labels, in display order. Replaces the whole list.
    #[arg(long, value_delimiter = ',')]
    cards: Option<Vec<String>>,

    /// Comma-separated category labels, in display order. Replaces the whole list.
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// A category budget as CATEGORY=AMOUNT. Repeat for each category. When given, these replace
    /// all category budgets.
    #[arg(long = "category-budget", value_parser = parse_category_budget)]
    category_budgets: Vec<(String, Amount)>,

    /// Refuse to write unless the stored config is still at this version.
    #[arg(long)]
    expected_version: Option<u64>,
}

impl AdminSetArgs {
    pub fn monthly_budget(&self) -> Option<Amount> {
        self.monthly_budget
    }

    pub fn cards(&self) -> Option<&[String]> {
        self.cards.as_deref()
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.categories.as_deref()
    }

    /// `None` when no category budget was given.
    pub fn category_budgets(&self) -> Option<BTreeMap<String, Amount>> {
        if self.category_budgets.is_empty() {
            None
        } else {
            Some(self.category_budgets.iter().cloned().collect())
        }
    }

    pub fn expected_version(&self) -> Option<u64> {
        self.expected_version
    }
}

fn parse_category_budget(s: &str) -> Result<(String, Amount), String> {
    let (category, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected CATEGORY=AMOUNT, got '{s}'"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("Missing category in '{s}'"));
    }
    let amount = Amount::from_str(amount).map_err(|e| e.to_string())?;
    Ok((category.to_string(), amount))
}

/// (Not shown): Args for the `budget select` command.
#[derive(Debug, Parser, Clone)]
pub struct SelectArgs {
    /// The household member whose transactions are shown by default.
    #[arg(long)]
    user: Option<String>,

    /// The month shown by default, as YYYY-MM.
    #[arg(long)]
    month: Option<YearMonth>,
}

impl SelectArgs {
    pub fn new(user: Option<String>, month: Option<YearMonth>) -> Self {
        Self { user, month }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn month(&self) -> Option<YearMonth> {
        self.month
    }
}

fn default_budget_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("budget"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --budget-home or BUDGET_HOME instead of relying on the default \
                budget home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("budget")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

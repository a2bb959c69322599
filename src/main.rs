use budget_sheet::args::{AdminSubcommand, Args, Command};
use budget_sheet::model::{AdminConfigPatch, TransactionInput};
use budget_sheet::{commands, BudgetStore, Config, Mode, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().budget_home().path();

    // When BUDGET_SHEET_LOCAL_MODE is set and non-empty the local JSON sheet is used even if a
    // spreadsheet is configured.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.sheet_url(),
            init_args.service_account(),
            init_args.sample(),
        )
        .await?
        .print(),

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            commands::serve(config, mode, serve_args.bind())
                .await?
                .print()
        }

        Command::Add(add_args) => {
            let (config, mut store) = open(home, mode).await?;
            let input = TransactionInput {
                kind: add_args.kind(),
                description: add_args.description().to_string(),
                date: add_args.date().unwrap_or_else(|| config.zone().today()),
                amount: add_args.amount(),
                card: add_args.card().to_string(),
                category: add_args.category().to_string(),
                note: add_args.note().to_string(),
            };
            commands::add(&mut store, input).await?.print()
        }

        Command::Summary(summary_args) => {
            let (_, mut store) = open(home, mode).await?;
            commands::summary(&mut store, summary_args.month(), summary_args.user())
                .await?
                .print()
        }

        Command::Analyze(analyze_args) => {
            let (_, mut store) = open(home, mode).await?;
            commands::analyze(&mut store, analyze_args.month())
                .await?
                .print()
        }

        // Admin settings and the selection live in local files, so these never need the sheet.
        Command::Admin(admin_args) => {
            let (_, mut store) = open(home, Mode::Local).await?;
            match admin_args.action() {
                AdminSubcommand::Show => commands::admin_show(&mut store).await?.print(),
                AdminSubcommand::Set(set) => {
                    let patch = AdminConfigPatch {
                        cards: set.cards().map(<[String]>::to_vec),
                        categories: set.categories().map(<[String]>::to_vec),
                        monthly_budget: set.monthly_budget(),
                        category_budgets: set.category_budgets(),
                    };
                    commands::admin_set(&mut store, patch, set.expected_version())
                        .await?
                        .print()
                }
            }
        }

        Command::Select(select_args) => {
            let (_, mut store) = open(home, Mode::Local).await?;
            commands::select(&mut store, select_args.user(), select_args.month())
                .await?
                .print()
        }
    };
    Ok(())
}

async fn open(home: &Path, mode: Mode) -> Result<(Config, BudgetStore)> {
    let config = Config::load(home).await?;
    let store = BudgetStore::open(&config, mode).await?;
    Ok((config, store))
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this package only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

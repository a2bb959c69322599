mod aggregate;
mod analysis;
mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
mod server;
mod store;
mod utils;


pub use api::{Mode, SheetRange};
pub use config::Config;
pub use error::{Error, ErrorCode, ErrorType, Result};
pub use model::Amount;
pub use store::{BudgetStore, UiState};

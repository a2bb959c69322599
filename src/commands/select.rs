use crate::commands::Out;
use crate::error::{Error, ErrorType};
use crate::model::YearMonth;
use crate::store::{BudgetStore, UiState};
use crate::Result;
use anyhow::anyhow;

/// Saves the selected member and month. With neither given it reports the current selection.
pub async fn select(
    store: &mut BudgetStore,
    user: Option<&str>,
    month: Option<YearMonth>,
) -> Result<Out<UiState>> {
    if let Some(user) = user {
        if !store.owners().names().iter().any(|name| name == user) {
            return Err(Error::new(
                ErrorType::Request,
                anyhow!(
                    "'{user}' is not a household member, expected one of: {}",
                    store.owners().names().join(", ")
                ),
            ));
        }
        store.set_selected_user(user).await?;
    }
    if let Some(month) = month {
        store.set_selected_month(month).await?;
    }

    let state = UiState {
        selected_user: store.selected_user().to_string(),
        selected_month: Some(store.selected_month()),
    };
    let message = format!(
        "Selected {} in {}",
        state.selected_user,
        store.selected_month()
    );
    Ok(Out::new(message, state))
}

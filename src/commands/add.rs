use crate::commands::Out;
use crate::model::{TransactionInput, TransactionView};
use crate::store::BudgetStore;
use crate::Result;

/// Appends `input` to the current month's tab.
pub async fn add(store: &mut BudgetStore, input: TransactionInput) -> Result<Out<TransactionView>> {
    let tab = store.append_tab();
    let view = store.add_transaction(input).await?;
    let message = format!(
        "Added {} '{}' of {}원 to {tab} for {}",
        view.kind, view.description, view.amount, view.owner
    );
    Ok(Out::new(message, view))
}

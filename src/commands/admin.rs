use crate::commands::Out;
use crate::model::{AdminConfig, AdminConfigPatch};
use crate::store::BudgetStore;
use crate::Result;

pub async fn admin_show(store: &mut BudgetStore) -> Result<Out<AdminConfig>> {
    let config = store.load_admin_config().await?.clone();
    let message = format!(
        "Admin config version {}: monthly budget {}원, {} cards, {} categories",
        config.version,
        config.monthly_budget,
        config.cards.len(),
        config.categories.len()
    );
    Ok(Out::new(message, config))
}

/// Applies `patch`. With `expected_version` the write is refused when someone else saved in
/// the meantime.
pub async fn admin_set(
    store: &mut BudgetStore,
    patch: AdminConfigPatch,
    expected_version: Option<u64>,
) -> Result<Out<AdminConfig>> {
    let config = store.update_admin_config(patch, expected_version).await?;
    let message = format!("Saved admin config version {}", config.version);
    Ok(Out::new(message, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::model::Amount;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_show_and_set() {
        let env = TestEnv::new().await;
        let mut store = env.store().await;
        let out = admin_show(&mut store).await.unwrap();
        assert!(out.message().starts_with("Admin config version 0"));

        let patch = AdminConfigPatch {
            cards: Some(vec!["성욱현금".to_string()]),
            monthly_budget: Some(Amount::from(1_500_000)),
            ..AdminConfigPatch::default()
        };
        let out = admin_set(&mut store, patch.clone(), Some(0)).await.unwrap();
        assert_eq!(out.message(), "Saved admin config version 1");

        let mut other = env.store().await;
        let shown = admin_show(&mut other).await.unwrap();
        assert_eq!(shown.structure().unwrap().cards.len(), 1);
        assert!(shown.message().contains("monthly budget 1,500,000원"));

        let err = admin_set(&mut other, patch, Some(0)).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Conflict);
    }
}

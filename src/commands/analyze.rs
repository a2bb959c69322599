use crate::commands::Out;
use crate::model::{AnalysisResult, YearMonth};
use crate::store::BudgetStore;
use crate::Result;

/// Compares the spending of `month` (the selected month by default) with the admin budgets.
pub async fn analyze(store: &mut BudgetStore, month: Option<YearMonth>) -> Result<Out<AnalysisResult>> {
    let month = month.unwrap_or_else(|| store.selected_month());
    store.load_admin_config().await?;
    store.load_transactions(Some(month)).await?;
    let analysis = store.generate_analysis(Some(month));

    let mut lines = vec![format!(
        "{month}: spent {}% of the monthly budget",
        analysis.monthly_spending_ratio
    )];
    if !analysis.overspent_categories.is_empty() {
        lines.push(format!(
            "Overspent: {}",
            analysis.overspent_categories.join(", ")
        ));
    }
    lines.extend(analysis.saving_tips.iter().map(|tip| format!("- {tip}")));
    Ok(Out::new(lines.join("\n"), analysis))
}

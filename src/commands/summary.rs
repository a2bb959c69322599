use crate::commands::Out;
use crate::model::{
    CategorySummary, MonthlySummary, TransactionView, UserExpenseSummary, YearMonth,
};
use crate::store::BudgetStore;
use crate::Result;
use serde::Serialize;

/// Everything `budget summary` reports about one month.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthReport {
    pub month: YearMonth,
    pub totals: Option<MonthlySummary>,
    pub categories: Vec<CategorySummary>,
    pub users: Vec<UserExpenseSummary>,
    pub transactions: Vec<TransactionView>,
}

/// Loads `month` (the selected month by default) and summarizes it. When `user` is given only
/// that member's transactions are listed; the summaries always cover the whole household.
pub async fn summary(
    store: &mut BudgetStore,
    month: Option<YearMonth>,
    user: Option<&str>,
) -> Result<Out<MonthReport>> {
    let month = month.unwrap_or_else(|| store.selected_month());
    store.load_transactions(Some(month)).await?;

    let report = MonthReport {
        month,
        totals: store.monthly_summary(Some(month)),
        categories: store.category_summary(Some(month)),
        users: store.user_expense_summary(Some(month)),
        transactions: store
            .transactions()
            .iter()
            .filter(|t| user.map_or(true, |u| t.owner == u))
            .cloned()
            .collect(),
    };
    Ok(Out::new(render(&report), report))
}

fn render(report: &MonthReport) -> String {
    let Some(totals) = &report.totals else {
        return format!("No transactions in {}", report.month);
    };
    let mut lines = vec![format!(
        "{}: expense {}원, income {}원, net {}원",
        report.month, totals.total_expense, totals.total_income, totals.net_income
    )];
    if !report.categories.is_empty() {
        lines.push("By category:".to_string());
        lines.extend(report.categories.iter().map(|c| {
            format!(
                "  {} {}원 ({}%, {} transactions)",
                c.category, c.amount, c.percentage, c.count
            )
        }));
    }
    if !report.users.is_empty() {
        lines.push("By member:".to_string());
        lines.extend(report.users.iter().map(|u| {
            format!(
                "  {} {}원 ({} transactions)",
                u.user, u.total_amount, u.transaction_count
            )
        }));
    }
    lines.push(format!("{} transactions listed", report.transactions.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_summary_of_september() {
        let env = TestEnv::new().await;
        let mut store = env.store().await;
        let month = YearMonth::new(2025, 9).unwrap();
        let out = summary(&mut store, Some(month), Some("성욱")).await.unwrap();

        let report = out.structure().unwrap();
        assert_eq!(report.totals.unwrap().total_expense, Amount::from(66250));
        assert_eq!(report.categories.len(), 3);
        assert_eq!(report.users.len(), 2);
        assert_eq!(report.transactions.len(), 1);
        assert!(out
            .message()
            .starts_with("2025-09: expense 66,250원, income 3,000,000원, net 2,933,750원"));
        assert!(out.message().contains("  운동 50,000원 (75.47%, 1 transactions)"));
    }

    #[test]
    fn test_render_empty_month() {
        let report = MonthReport {
            month: YearMonth::new(2025, 10).unwrap(),
            totals: None,
            categories: vec![],
            users: vec![],
            transactions: vec![],
        };
        assert_eq!(render(&report), "No transactions in 2025-10");
    }
}

//! Compares a month of expenses against the budgets in `AdminConfig`.

use crate::aggregate::{calculate_percentage, category_totals};
use crate::model::{AdminConfig, AnalysisResult, Amount, TransactionView};
use rust_decimal::Decimal;

/// A category is overspent when it goes more than 20% over its budget.
const OVERSPEND_FACTOR: Decimal = Decimal::from_parts(12, 0, 0, false, 1);

/// Builds the analysis for `expenses`, which are expected to be the expense transactions of a
/// single month. Categories without a positive budget are never reported as overspent.
pub fn analyze(expenses: &[&TransactionView], config: &AdminConfig) -> AnalysisResult {
    let overspent_categories: Vec<String> = category_totals(expenses)
        .into_iter()
        .filter(|(category, amount)| is_overspent(*amount, config.budget_for(category)))
        .map(|(category, _)| category)
        .collect();

    let mut saving_tips = Vec::new();
    if !overspent_categories.is_empty() {
        saving_tips.push(format!(
            "{} 카테고리에서 예산을 초과했습니다.",
            overspent_categories.join(", ")
        ));
        saving_tips.push("다음 달에는 해당 카테고리의 지출을 줄여보세요.".to_string());
    }

    let total_spent: Amount = expenses.iter().map(|t| t.amount).sum();
    let budget_exceeded = total_spent.saturating_excess_over(config.monthly_budget);
    if total_spent > config.monthly_budget {
        saving_tips.push(format!(
            "이번 달 총 지출이 예산을 {budget_exceeded}원 초과했습니다."
        ));
    }

    let monthly_spending_ratio = if config.monthly_budget > Amount::ZERO {
        calculate_percentage(total_spent, config.monthly_budget)
    } else {
        Decimal::ZERO
    };

    AnalysisResult {
        overspent_categories,
        saving_tips,
        budget_exceeded,
        monthly_spending_ratio,
    }
}

fn is_overspent(amount: Amount, budget: Amount) -> bool {
    if budget <= Amount::ZERO {
        return false;
    }
    budget
        .value()
        .checked_mul(OVERSPEND_FACTOR)
        .map(|limit| amount.value() > limit)
        .unwrap_or(false)
}

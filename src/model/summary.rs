//! Derived, non-persisted views over transactions. These are rebuilt on every request.

use crate::model::{Amount, LedgerEntry, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Totals for one calendar day together with the rows that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_expense: Amount,
    pub total_income: Amount,
    pub net_income: Amount,
    pub transaction_count: usize,
    pub detail: Vec<LedgerEntry>,
}

impl DailySummary {
    pub(crate) fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_expense: Amount::ZERO,
            total_income: Amount::ZERO,
            net_income: Amount::ZERO,
            transaction_count: 0,
            detail: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub total_expense: Amount,
    pub total_income: Amount,
    pub net_income: Amount,
}

/// Expense total of one category and its share of the total it is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub amount: Amount,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExpenseSummary {
    pub user: String,
    pub total_amount: Amount,
    pub transaction_count: usize,
    pub category_breakdown: Vec<CategorySummary>,
}

/// Outcome of comparing a month of spending with the configured budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overspent_categories: Vec<String>,
    pub saving_tips: Vec<String>,
    pub budget_exceeded: Amount,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_spending_ratio: Decimal,
}

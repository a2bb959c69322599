//! Folds normalized rows and transactions into totals and breakdowns.
//!
//! Two inputs are aggregated. `LedgerEntry` rows come straight from a sheet tab and keep their
//! type label as written, so the label pair decides what counts as expense or income.
//! `TransactionView`s are already classified and carry an owner. Rows without a usable amount or
//! date are left out everywhere without error.

use crate::model::{
    Amount, CategorySummary, DailySummary, Labels, LedgerEntry, MonthlySummary, Period,
    TransactionType, TransactionView, UserExpenseSummary, YearMonth, Zone,
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `value / total * 100` rounded to two decimals, or zero when `total` is zero.
pub fn calculate_percentage(value: Amount, total: Amount) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    value
        .value()
        .checked_div(total.value())
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

/// Clamps a requested page size into `1..=max`, using `default` when nothing was requested.
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}

/// Reads a page size from a query string value. Anything numeric counts, fractions are truncated
/// and negatives become zero. Non-numeric values are treated as absent.
pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n as usize)
}

/// Which rows of a day to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    Both,
    Expense,
    Income,
}

serde_plain::derive_display_from_serialize!(TypeFilter);
serde_plain::derive_fromstr_from_deserialize!(TypeFilter);

impl TypeFilter {
    fn accepts(&self, kind: Option<TransactionType>) -> bool {
        match (self, kind) {
            (_, None) => false,
            (TypeFilter::Both, Some(_)) => true,
            (TypeFilter::Expense, Some(k)) => k == TransactionType::Expense,
            (TypeFilter::Income, Some(k)) => k == TransactionType::Income,
        }
    }
}

/// Per-day totals keyed by calendar day. Rows with a label that is neither the expense nor the
/// income label are listed and counted but do not add to either sum.
pub fn daily_summaries(entries: &[LedgerEntry], labels: &Labels) -> BTreeMap<NaiveDate, DailySummary> {
    let mut daily: BTreeMap<NaiveDate, DailySummary> = BTreeMap::new();
    for entry in entries {
        let Some((amount, date)) = entry.amount_and_date() else {
            continue;
        };
        let day = date.date_naive();
        let summary = daily
            .entry(day)
            .or_insert_with(|| DailySummary::empty(day));
        match labels.classify(&entry.label) {
            Some(TransactionType::Expense) => summary.total_expense += amount,
            Some(TransactionType::Income) => summary.total_income += amount,
            None => {}
        }
        summary.detail.push(entry.clone());
    }
    for summary in daily.values_mut() {
        summary.transaction_count = summary.detail.len();
        summary.net_income = summary.total_income - summary.total_expense;
    }
    daily
}

/// Expense and income totals of the rows dated within `month` in `zone`.
pub fn month_totals(
    entries: &[LedgerEntry],
    month: YearMonth,
    zone: &Zone,
    labels: &Labels,
) -> MonthlySummary {
    let period = month.period(zone);
    let mut total_expense = Amount::ZERO;
    let mut total_income = Amount::ZERO;
    for (kind, amount) in entries.iter().filter_map(|e| {
        let (amount, date) = e.amount_and_date()?;
        period
            .contains(&date)
            .then(|| (labels.classify(&e.label), amount))
    }) {
        match kind {
            Some(TransactionType::Expense) => total_expense += amount,
            Some(TransactionType::Income) => total_income += amount,
            None => {}
        }
    }
    MonthlySummary {
        month,
        total_expense,
        total_income,
        net_income: total_income - total_expense,
    }
}

/// Expense total of `month` alone.
pub fn month_expense_total(
    entries: &[LedgerEntry],
    month: YearMonth,
    zone: &Zone,
    labels: &Labels,
) -> Amount {
    month_totals(entries, month, zone, labels).total_expense
}

/// The `limit` most recent dated rows, newest first. Rows sharing a date keep sheet order.
pub fn recent(entries: &[LedgerEntry], limit: usize) -> Vec<LedgerEntry> {
    let mut dated: Vec<&LedgerEntry> = entries.iter().filter(|e| e.date.is_some()).collect();
    dated.sort_by(|a, b| b.date.cmp(&a.date));
    dated.into_iter().take(limit).cloned().collect()
}

/// Rows dated within the one-day `period` that pass `filter`, newest first, at most `limit` of
/// them.
pub fn on_day(
    entries: &[LedgerEntry],
    period: Period,
    filter: TypeFilter,
    labels: &Labels,
    limit: usize,
) -> Vec<LedgerEntry> {
    let mut items: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| e.date.map(|d| period.contains(&d)).unwrap_or(false))
        .filter(|e| filter.accepts(labels.classify(&e.label)))
        .collect();
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.into_iter().take(limit).cloned().collect()
}

/// The transactions of `month`.
pub fn in_month(transactions: &[TransactionView], month: YearMonth) -> Vec<&TransactionView> {
    transactions.iter().filter(|t| t.month() == month).collect()
}

/// The expense transactions of `month`.
pub fn expenses_in_month(transactions: &[TransactionView], month: YearMonth) -> Vec<&TransactionView> {
    in_month(transactions, month)
        .into_iter()
        .filter(|t| t.kind == TransactionType::Expense)
        .collect()
}

/// Income and expense totals of `month`, or `None` when the month has no transactions.
pub fn monthly_summary(transactions: &[TransactionView], month: YearMonth) -> Option<MonthlySummary> {
    let current = in_month(transactions, month);
    if current.is_empty() {
        return None;
    }
    let total_of = |kind: TransactionType| -> Amount {
        current
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    };
    let total_income = total_of(TransactionType::Income);
    let total_expense = total_of(TransactionType::Expense);
    Some(MonthlySummary {
        month,
        total_expense,
        total_income,
        net_income: total_income - total_expense,
    })
}

/// Groups expenses by category, largest first. Percentages are relative to the sum of
/// `expenses`. Equal amounts keep first-seen order.
pub fn category_summary(expenses: &[&TransactionView]) -> Vec<CategorySummary> {
    let mut summary = category_breakdown(expenses);
    summary.sort_by(|a, b| b.amount.cmp(&a.amount));
    summary
}

/// Groups expenses by owner in first-seen order. Each owner's category breakdown is relative to
/// that owner's total and stays in first-seen order.
pub fn user_expense_summary(expenses: &[&TransactionView]) -> Vec<UserExpenseSummary> {
    group_by(expenses.iter().copied(), |t| t.owner.clone())
        .into_iter()
        .map(|(user, transactions)| UserExpenseSummary {
            user,
            total_amount: transactions.iter().map(|t| t.amount).sum(),
            transaction_count: transactions.len(),
            category_breakdown: category_breakdown(&transactions),
        })
        .collect()
}

/// Sum of the amounts of each category present in `expenses`, keyed in first-seen order.
pub fn category_totals(expenses: &[&TransactionView]) -> Vec<(String, Amount)> {
    group_by(expenses.iter().copied(), |t| t.category.clone())
        .into_iter()
        .map(|(category, group)| (category, group.iter().map(|t| t.amount).sum()))
        .collect()
}

fn category_breakdown(expenses: &[&TransactionView]) -> Vec<CategorySummary> {
    let total: Amount = expenses.iter().map(|t| t.amount).sum();
    group_by(expenses.iter().copied(), |t| t.category.clone())
        .into_iter()
        .map(|(category, group)| {
            let amount: Amount = group.iter().map(|t| t.amount).sum();
            CategorySummary {
                category,
                amount,
                percentage: calculate_percentage(amount, total),
                count: group.len(),
            }
        })
        .collect()
}

/// Groups items by key, preserving the order in which keys are first seen.
fn group_by<'a, T, K, F>(items: impl IntoIterator<Item = &'a T>, key: F) -> Vec<(K, Vec<&'a T>)>
where
    T: 'a,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, group)) => group.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

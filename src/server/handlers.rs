use crate::aggregate::{
    clamp_limit, daily_summaries, month_expense_total, month_totals, on_day, parse_limit, recent,
    TypeFilter,
};
use crate::api::SheetRange;
use crate::model::columns::LEDGER_RANGE;
use crate::model::{
    AdminConfig, AdminConfigPatch, AnalysisResult, Amount, CategoryRow, CategorySummary,
    DailySummary, LedgerEntry, MonthlySummary, Period, RawCell, RawRow, TransactionInput,
    TransactionView, UserExpenseSummary, YearMonth,
};
use crate::server::error::{ApiError, ApiResponse};
use crate::server::AppState;
use crate::store::BudgetStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

const RECENT_DEFAULT: usize = 5;
const RECENT_MAX: usize = 100;
const TODAY_DEFAULT: usize = 100;
const TODAY_MAX: usize = 200;

/// Query parameters for reading a range of a tab.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RangeQuery {
    sheet_name: Option<String>,
    range: Option<String>,
}

impl RangeQuery {
    fn sheet_range(&self) -> ApiResponse<SheetRange> {
        let name = self
            .sheet_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("sheetName is required".to_string()))?;
        Ok(SheetRange::new(name, self.range.as_deref()))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RangeValues<T> {
    sheet: String,
    range: String,
    values: Vec<T>,
}

/// Axum handler function for GET /api/sheets/get
pub(crate) async fn get_values(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResponse<Json<RangeValues<RawCell>>> {
    info!("GET /api/sheets/get - query: {query:?}");
    let range = query.sheet_range()?;
    let rows = state.store.lock().await.read(&range).await?;
    let values = rows
        .into_iter()
        .flatten()
        .filter(|c| !c.is_blank())
        .collect();
    Ok(Json(RangeValues {
        sheet: range.tab().to_string(),
        range: range.range_label().to_string(),
        values,
    }))
}

/// Axum handler function for GET /api/sheets/get/category
pub(crate) async fn get_categories(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResponse<Json<RangeValues<CategoryRow>>> {
    info!("GET /api/sheets/get/category - query: {query:?}");
    let range = query.sheet_range()?;
    let rows = state.store.lock().await.read(&range).await?;
    Ok(Json(RangeValues {
        sheet: range.tab().to_string(),
        range: range.range_label().to_string(),
        values: CategoryRow::from_rows(&rows),
    }))
}

/// A ledger row as listed by the recent and today routes.
#[derive(Debug, Serialize)]
pub(crate) struct Item {
    #[serde(rename = "type")]
    kind: String,
    item: String,
    amount: Option<Amount>,
    date: DateTime<FixedOffset>,
    description: String,
    card: String,
    note: String,
}

impl Item {
    fn from_entry(entry: LedgerEntry) -> Option<Self> {
        Some(Self {
            date: entry.date?,
            kind: entry.label,
            item: entry.category,
            amount: entry.amount,
            description: entry.description,
            card: entry.card,
            note: entry.note,
        })
    }
}

fn items(entries: Vec<LedgerEntry>) -> Vec<Item> {
    entries.into_iter().filter_map(Item::from_entry).collect()
}

/// Reads and normalizes the ledger tab `sheet_name`, or the current month tab.
async fn ledger(state: &AppState, sheet_name: Option<&str>) -> ApiResponse<(String, Vec<LedgerEntry>)> {
    let mut store = state.store.lock().await;
    let tab = sheet_tab(&store, sheet_name, None);
    let rows = store
        .read(&SheetRange::new(&tab, Some(LEDGER_RANGE)))
        .await?;
    let entries = LedgerEntry::from_rows(&rows, store.zone());
    Ok((tab, entries))
}

/// An explicit name wins, then the tab of `month`, then the current month tab.
fn sheet_tab(store: &BudgetStore, sheet_name: Option<&str>, month: Option<YearMonth>) -> String {
    sheet_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| month.map(|m| m.tab_name()))
        .unwrap_or_else(|| store.append_tab())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentQuery {
    sheet_name: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemList {
    items: Vec<Item>,
}

/// Axum handler function for GET /api/sheets/get/recent
pub(crate) async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResponse<Json<ItemList>> {
    info!("GET /api/sheets/get/recent - query: {query:?}");
    let (_, entries) = ledger(&state, query.sheet_name.as_deref()).await?;
    let limit = clamp_limit(parse_limit(query.limit.as_deref()), RECENT_DEFAULT, RECENT_MAX);
    Ok(Json(ItemList {
        items: items(recent(&entries, limit)),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TodayQuery {
    sheet_name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    date: Option<NaiveDate>,
    limit: Option<String>,
    expense_label: Option<String>,
    income_label: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TypeMeta {
    #[serde(rename = "type")]
    kind: TypeFilter,
}

#[derive(Debug, Serialize)]
pub(crate) struct DayItems {
    date: NaiveDate,
    count: usize,
    items: Vec<Item>,
    meta: TypeMeta,
}

/// Axum handler function for GET /api/sheets/get/today
pub(crate) async fn get_today(
    State(state): State<AppState>,
    Query(query): Query<TodayQuery>,
) -> ApiResponse<Json<DayItems>> {
    info!("GET /api/sheets/get/today - query: {query:?}");
    let (_, entries) = ledger(&state, query.sheet_name.as_deref()).await?;
    let (labels, zone) = {
        let store = state.store.lock().await;
        let labels = store
            .labels()
            .with_overrides(query.expense_label.as_deref(), query.income_label.as_deref());
        (labels, store.zone().clone())
    };

    // Unknown types fall back to both, like a missing one.
    let filter = query
        .kind
        .as_deref()
        .and_then(|k| k.trim().to_lowercase().parse::<TypeFilter>().ok())
        .unwrap_or_default();
    let day = query.date.unwrap_or_else(|| zone.today());
    let limit = clamp_limit(parse_limit(query.limit.as_deref()), TODAY_DEFAULT, TODAY_MAX);
    let period = Period::day(day, &zone)
        .ok_or_else(|| ApiError::BadRequest(format!("Date {day} is out of range")))?;

    let items = items(on_day(&entries, period, filter, &labels, limit));
    Ok(Json(DayItems {
        date: day,
        count: items.len(),
        items,
        meta: TypeMeta { kind: filter },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MonthQuery {
    sheet_name: Option<String>,
    ym: Option<YearMonth>,
    expense_label: Option<String>,
    income_label: Option<String>,
}

/// Resolves the month, the tab and reads it.
async fn month_ledger(
    state: &AppState,
    query: &MonthQuery,
) -> ApiResponse<(YearMonth, String, Vec<LedgerEntry>)> {
    let (month, tab) = {
        let store = state.store.lock().await;
        let month = query.ym.unwrap_or_else(|| YearMonth::current(store.zone()));
        (month, sheet_tab(&store, query.sheet_name.as_deref(), Some(month)))
    };
    let (tab, entries) = ledger(state, Some(&tab)).await?;
    Ok((month, tab, entries))
}

/// Axum handler function for GET /api/sheets/get/total/month
pub(crate) async fn get_month_total(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResponse<Json<MonthlySummary>> {
    info!("GET /api/sheets/get/total/month - query: {query:?}");
    let (month, _, entries) = month_ledger(&state, &query).await?;
    let store = state.store.lock().await;
    let labels = store
        .labels()
        .with_overrides(query.expense_label.as_deref(), query.income_label.as_deref());
    Ok(Json(month_totals(&entries, month, store.zone(), &labels)))
}

#[derive(Debug, Serialize)]
pub(crate) struct SheetMeta {
    sheet: String,
    tz: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MonthExpense {
    month: YearMonth,
    total: Amount,
    meta: SheetMeta,
}

/// Axum handler function for GET /api/sheets/get/total/month/expense
pub(crate) async fn get_month_expense(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResponse<Json<MonthExpense>> {
    info!("GET /api/sheets/get/total/month/expense - query: {query:?}");
    let (month, sheet, entries) = month_ledger(&state, &query).await?;
    let store = state.store.lock().await;
    let labels = store
        .labels()
        .with_overrides(query.expense_label.as_deref(), query.income_label.as_deref());
    Ok(Json(MonthExpense {
        month,
        total: month_expense_total(&entries, month, store.zone(), &labels),
        meta: SheetMeta {
            sheet,
            tz: store.zone().name().to_string(),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetQuery {
    sheet_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Daily {
    daily: BTreeMap<String, DailySummary>,
}

/// Axum handler function for GET /api/sheets/get/total/daily
pub(crate) async fn get_daily(
    State(state): State<AppState>,
    Query(query): Query<SheetQuery>,
) -> ApiResponse<Json<Daily>> {
    info!("GET /api/sheets/get/total/daily - query: {query:?}");
    let (_, entries) = ledger(&state, query.sheet_name.as_deref()).await?;
    let labels = state.store.lock().await.labels().clone();
    let daily = daily_summaries(&entries, &labels)
        .into_iter()
        .map(|(day, summary)| (day.to_string(), summary))
        .collect();
    Ok(Json(Daily { daily }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppendBody {
    #[serde(default)]
    values: RawRow,
}

#[derive(Debug, Serialize)]
pub(crate) struct Appended {
    ok: bool,
    tab: String,
}

/// Axum handler function for POST /api/sheets/append
pub(crate) async fn append(
    State(state): State<AppState>,
    Json(body): Json<AppendBody>,
) -> ApiResponse<Json<Appended>> {
    info!("POST /api/sheets/append - {} values", body.values.len());
    if body.values.is_empty() {
        return Err(ApiError::BadRequest("values required".to_string()));
    }
    let tab = state.store.lock().await.append_row(&body.values).await?;
    Ok(Json(Appended { ok: true, tab }))
}

/// Axum handler function for POST /api/transactions
pub(crate) async fn create_transaction(
    State(state): State<AppState>,
    Json(input): Json<TransactionInput>,
) -> ApiResponse<(StatusCode, Json<TransactionView>)> {
    info!("POST /api/transactions - request: {input:?}");
    let view = state.store.lock().await.add_transaction(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryQuery {
    ym: Option<YearMonth>,
    user: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MonthList<T> {
    month: YearMonth,
    items: Vec<T>,
}

/// Loads the transactions of `ym` (the selected month by default) into the store.
async fn load_month(store: &mut BudgetStore, ym: Option<YearMonth>) -> ApiResponse<YearMonth> {
    let month = ym.unwrap_or_else(|| store.selected_month());
    store.load_transactions(Some(month)).await?;
    Ok(month)
}

/// Axum handler function for GET /api/transactions
pub(crate) async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResponse<Json<MonthList<TransactionView>>> {
    info!("GET /api/transactions - query: {query:?}");
    let mut store = state.store.lock().await;
    let month = load_month(&mut store, query.ym).await?;
    let items = store
        .transactions()
        .iter()
        .filter(|t| query.user.as_deref().map_or(true, |u| t.owner == u))
        .cloned()
        .collect();
    Ok(Json(MonthList { month, items }))
}

/// Axum handler function for GET /api/summary/month
pub(crate) async fn month_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResponse<Json<Option<MonthlySummary>>> {
    info!("GET /api/summary/month - query: {query:?}");
    let mut store = state.store.lock().await;
    let month = load_month(&mut store, query.ym).await?;
    Ok(Json(store.monthly_summary(Some(month))))
}

/// Axum handler function for GET /api/summary/categories
pub(crate) async fn category_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResponse<Json<MonthList<CategorySummary>>> {
    info!("GET /api/summary/categories - query: {query:?}");
    let mut store = state.store.lock().await;
    let month = load_month(&mut store, query.ym).await?;
    Ok(Json(MonthList {
        month,
        items: store.category_summary(Some(month)),
    }))
}

/// Axum handler function for GET /api/summary/users
pub(crate) async fn user_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResponse<Json<MonthList<UserExpenseSummary>>> {
    info!("GET /api/summary/users - query: {query:?}");
    let mut store = state.store.lock().await;
    let month = load_month(&mut store, query.ym).await?;
    Ok(Json(MonthList {
        month,
        items: store.user_expense_summary(Some(month)),
    }))
}

/// Axum handler function for GET /api/analysis
pub(crate) async fn analysis(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResponse<Json<AnalysisResult>> {
    info!("GET /api/analysis - query: {query:?}");
    let mut store = state.store.lock().await;
    store.load_admin_config().await?;
    let month = load_month(&mut store, query.ym).await?;
    Ok(Json(store.generate_analysis(Some(month))))
}

/// Axum handler function for GET /api/admin
pub(crate) async fn get_admin(State(state): State<AppState>) -> ApiResponse<Json<AdminConfig>> {
    info!("GET /api/admin");
    let mut store = state.store.lock().await;
    Ok(Json(store.load_admin_config().await?.clone()))
}

/// A partial admin config plus the version it was edited from.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminUpdate {
    #[serde(flatten)]
    patch: AdminConfigPatch,
    version: Option<u64>,
}

/// Axum handler function for PUT /api/admin
pub(crate) async fn put_admin(
    State(state): State<AppState>,
    Json(update): Json<AdminUpdate>,
) -> ApiResponse<Json<AdminConfig>> {
    info!("PUT /api/admin - version: {:?}", update.version);
    let mut store = state.store.lock().await;
    let config = store
        .update_admin_config(update.patch, update.version)
        .await?;
    Ok(Json(config))
}

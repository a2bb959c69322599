//! The HTTP JSON API. Handlers share one `BudgetStore` behind a mutex, so requests are served one
//! at a time against the sheet.

mod error;
mod handlers;

use crate::api::Mode;
use crate::error::{ErrorType, IntoResult, Result};
use crate::store::BudgetStore;
use crate::Config;
use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Application state shared by all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<Mutex<BudgetStore>>,
}

impl AppState {
    pub(crate) fn new(store: BudgetStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sheet_routes = Router::new()
        .route("/get", get(handlers::get_values))
        .route("/get/category", get(handlers::get_categories))
        .route("/get/recent", get(handlers::get_recent))
        .route("/get/today", get(handlers::get_today))
        .route("/get/total/month", get(handlers::get_month_total))
        .route("/get/total/month/expense", get(handlers::get_month_expense))
        .route("/get/total/daily", get(handlers::get_daily))
        .route("/append", post(handlers::append));

    let api_routes = Router::new()
        .nest("/sheets", sheet_routes)
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/summary/month", get(handlers::month_summary))
        .route("/summary/categories", get(handlers::category_summary))
        .route("/summary/users", get(handlers::user_summary))
        .route("/analysis", get(handlers::analysis))
        .route("/admin", get(handlers::get_admin).put(handlers::put_admin));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}

/// Opens the store and serves the API on `bind`, or the configured address, until the process is
/// stopped.
pub async fn serve(config: &Config, mode: Mode, bind: Option<&str>) -> Result<()> {
    let store = BudgetStore::open(config, mode).await?;
    let addr = bind.unwrap_or(config.bind_address()).to_string();
    let app = router(AppState::new(store));

    info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Unable to bind to {addr}"))
        .pub_result(ErrorType::Service)?;
    axum::serve(listener, app)
        .await
        .context("The server stopped with an error")
        .pub_result(ErrorType::Service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(env: &TestEnv) -> Router {
        router(AppState::new(env.store().await))
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get_json(env: &TestEnv, uri: &str) -> (StatusCode, Value) {
        call(app(env).await, Method::GET, uri, None).await
    }

    #[tokio::test]
    async fn test_get_requires_sheet_name() {
        let env = TestEnv::new().await;
        let (status, body) = get_json(&env, "/api/sheets/get").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "sheetName is required"}));

        let (status, _) = get_json(&env, "/api/sheets/get/category?sheetName=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_values_flattens_and_drops_empties() {
        let env = TestEnv::new().await;
        let uri = "/api/sheets/get?sheetName=%EC%B9%B4%ED%85%8C%EA%B3%A0%EB%A6%AC&range=A2%3AC";
        let (status, body) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sheet"], "카테고리");
        assert_eq!(body["range"], "A2:C");
        let values = body["values"].as_array().unwrap();
        assert_eq!(values.len(), 8);
        assert_eq!(values[0], "식비");
        assert_eq!(values[1].as_f64(), Some(1.0));
    }

    #[tokio::test]
    async fn test_get_categories() {
        let env = TestEnv::new().await;
        let uri = "/api/sheets/get/category?sheetName=%EC%B9%B4%ED%85%8C%EA%B3%A0%EB%A6%AC";
        let (status, body) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["range"], "(entire sheet)");
        let values = body["values"].as_array().unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0]["name"], "식비");
        assert_eq!(values[0]["budget"].as_f64(), Some(500000.0));
        assert_eq!(values[2]["budget"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_tab_is_a_server_error() {
        let env = TestEnv::new().await;
        let (status, body) = get_json(&env, "/api/sheets/get?sheetName=nope").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Sheet 'nope' not found"));
    }

    #[tokio::test]
    async fn test_month_totals() {
        let env = TestEnv::new().await;
        let uri = "/api/sheets/get/total/month?sheetName=9%EC%9B%94&ym=2025-09";
        let (status, body) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], "2025-09");
        assert_eq!(body["totalExpense"].as_f64(), Some(66250.0));
        assert_eq!(body["totalIncome"].as_f64(), Some(3_000_000.0));
        assert_eq!(body["netIncome"].as_f64(), Some(2_933_750.0));

        // The tab defaults to the one named after the month.
        let (_, body) = get_json(&env, "/api/sheets/get/total/month/expense?ym=2025-09").await;
        assert_eq!(body["total"].as_f64(), Some(66250.0));
        assert_eq!(body["meta"]["sheet"], "9월");
        assert_eq!(body["meta"]["tz"], "Asia/Seoul");
    }

    #[tokio::test]
    async fn test_recent_and_today() {
        let env = TestEnv::new().await;
        let (_, body) = get_json(&env, "/api/sheets/get/recent?sheetName=9%EC%9B%94&limit=2").await;
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["item"], "교통비");
        assert_eq!(items[0]["date"], "2025-09-07T08:10:00+09:00");
        assert_eq!(items[1]["item"], "식비");
        assert_eq!(items[1]["amount"].as_f64(), Some(15000.0));

        let uri = "/api/sheets/get/today?sheetName=9%EC%9B%94&date=2025-09-07&type=both";
        let (_, body) = get_json(&env, uri).await;
        assert_eq!(body["date"], "2025-09-07");
        assert_eq!(body["count"], 2);
        assert_eq!(body["meta"]["type"], "both");

        let uri = "/api/sheets/get/today?sheetName=9%EC%9B%94&date=2025-09-07&type=income";
        let (_, body) = get_json(&env, uri).await;
        assert_eq!(body["count"], 0);

        let uri = "/api/sheets/get/today?sheetName=9%EC%9B%94&date=2025-09-07&type=expense&expenseLabel=%EC%9D%B4%EC%B2%B4";
        let (_, body) = get_json(&env, uri).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["items"][0]["description"], "저축");
    }

    #[tokio::test]
    async fn test_lenient_limit() {
        let env = TestEnv::new().await;
        let (status, body) = get_json(&env, "/api/sheets/get/recent?sheetName=9%EC%9B%94&limit=-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let uri = "/api/sheets/get/today?sheetName=9%EC%9B%94&date=2025-09-07&limit=abc";
        let (status, body) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_out_of_range_dates_are_bad_requests() {
        let env = TestEnv::new().await;
        let uri = "/api/sheets/get/today?sheetName=9%EC%9B%94&date=%2B262142-12-31";
        let (status, body) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("out of range"));

        let uri = "/api/sheets/get/total/month?sheetName=9%EC%9B%94&ym=2147483647-12";
        let (status, _) = get_json(&env, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&env, "/api/summary/month?ym=300000-09").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_daily() {
        let env = TestEnv::new().await;
        let (status, body) = get_json(&env, "/api/sheets/get/total/daily?sheetName=9%EC%9B%94").await;
        assert_eq!(status, StatusCode::OK);
        let day = &body["daily"]["2025-09-07"];
        assert_eq!(day["totalExpense"].as_f64(), Some(16250.0));
        assert_eq!(day["totalIncome"].as_f64(), Some(0.0));
        assert_eq!(day["netIncome"].as_f64(), Some(-16250.0));
        assert_eq!(day["transactionCount"], 3);
        assert_eq!(body["daily"].as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_append() {
        let env = TestEnv::new().await;
        let (status, body) = call(
            app(&env).await,
            Method::POST,
            "/api/sheets/append",
            Some(json!({"values": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "values required");

        let (status, body) = call(
            app(&env).await,
            Method::POST,
            "/api/sheets/append",
            Some(json!({"values": ["지출", "식비", 1000, "2025-09-08"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let tab = body["tab"].as_str().unwrap().to_string();
        let rows = env.sheet().rows(&tab);
        assert_eq!(rows.last().unwrap()[2], crate::model::RawCell::Number(1000.0));
    }

    #[tokio::test]
    async fn test_create_transaction() {
        let env = TestEnv::new().await;
        let input = json!({
            "type": "expense",
            "description": "헬스장 회비",
            "date": "2025-09-06",
            "amount": 50000,
            "card": "성욱현금",
            "category": "운동"
        });
        let (status, body) = call(app(&env).await, Method::POST, "/api/transactions", Some(input.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["owner"], "성욱");
        assert_eq!(body["date"], "2025-09-06T00:00:00+09:00");

        env.sheet().set_fail_appends(true);
        let (status, body) = call(app(&env).await, Method::POST, "/api/transactions", Some(input)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorCode"], "SAVE_TRANSACTION_FAILED");
    }

    #[tokio::test]
    async fn test_summaries_and_analysis() {
        let env = TestEnv::new().await;
        let (_, body) = get_json(&env, "/api/summary/categories?ym=2025-09").await;
        assert_eq!(body["month"], "2025-09");
        assert_eq!(body["items"][0]["category"], "운동");
        assert_eq!(body["items"][0]["percentage"].as_f64(), Some(75.47));

        let (_, body) = get_json(&env, "/api/summary/users?ym=2025-09").await;
        assert_eq!(body["items"][0]["user"], "회진");
        assert_eq!(body["items"][0]["categoryBreakdown"][0]["category"], "식비");

        let (_, body) = get_json(&env, "/api/summary/month?ym=2025-09").await;
        assert_eq!(body["totalExpense"].as_f64(), Some(66250.0));
        assert_eq!(body["netIncome"].as_f64(), Some(2_933_750.0));

        let (_, body) = get_json(&env, "/api/transactions?ym=2025-09&user=%EC%84%B1%EC%9A%B1").await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (_, body) = get_json(&env, "/api/analysis?ym=2025-09").await;
        assert_eq!(body["budgetExceeded"].as_f64(), Some(66250.0));
        assert_eq!(body["monthlySpendingRatio"].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn test_admin_round_trip_with_conflict() {
        let env = TestEnv::new().await;
        let (status, body) = get_json(&env, "/api/admin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 0);

        let update = json!({"monthlyBudget": 2000000, "version": 0});
        let (status, body) = call(app(&env).await, Method::PUT, "/api/admin", Some(update.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);
        assert_eq!(body["monthlyBudget"].as_f64(), Some(2_000_000.0));

        let (status, body) = call(app(&env).await, Method::PUT, "/api/admin", Some(update)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorCode"], "CONFIG_VERSION_CONFLICT");
    }
}

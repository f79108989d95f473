//! Tests for the tool surface over the axum router.
//!
//! Drives the routes end to end with a mock provider, checking payload
//! envelopes, the stable error `kind` field, and the cache introspection
//! tools.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sfin_common::Config;
use sfin_data::data::{
    AuthError, Credentials, FetchError, FundamentalsProvider, ScreenError, StatementKind,
};
use sfin_data::screen::CompiledScreen;
use sfin_data::{DataService, DataState};

// ============================================================================
// Mock Provider
// ============================================================================

struct MockProvider {
    login_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            login_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl FundamentalsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn login(&self, _credentials: &Credentials) -> Result<(), AuthError> {
        self.login_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Value, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        if ticker == "NOPE" {
            return Err(FetchError::UnknownTicker(ticker.to_string()));
        }
        Ok(json!({ "ticker": ticker, "kind": kind.slug() }))
    }

    async fn run_screen(&self, _query: &CompiledScreen) -> Result<Vec<String>, ScreenError> {
        Ok(vec!["TCS".into()])
    }
}

fn test_app() -> (Router, Arc<DataState>, Arc<MockProvider>) {
    let provider = Arc::new(MockProvider::new());
    let mut config = Config::default();
    config.credentials.email = Some("user@example.com".into());
    config.credentials.password = Some("hunter2".into());

    let state = Arc::new(DataState::with_provider(config, provider.clone()));
    (DataService::router(Arc::clone(&state)), state, provider)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

async fn post_empty(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Tool Surface
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (router, _, _) = test_app();

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "sfin-data");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_get_overview_envelope() {
    let (router, _, provider) = test_app();

    let (status, body) = get(&router, "/tools/get_overview/reliance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker"], "RELIANCE");
    assert_eq!(body["kind"], "overview");
    assert_eq!(body["data"]["ticker"], "RELIANCE");
    assert!(body["fetched_at"].is_string());
    assert_eq!(provider.fetch_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_every_statement_tool_responds() {
    let (router, _, provider) = test_app();

    let tools = [
        ("/tools/get_overview/TCS", "overview"),
        ("/tools/get_income_statement/TCS", "income"),
        ("/tools/get_balance_sheet/TCS", "balance_sheet"),
        ("/tools/get_cash_flow/TCS", "cash_flow"),
        ("/tools/get_quarterly_results/TCS", "quarterly"),
        ("/tools/get_shareholding/TCS", "shareholding"),
        ("/tools/get_peer_comparison/TCS", "peer_comparison"),
    ];

    for (uri, kind) in tools {
        let (status, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["kind"], kind, "{uri}");
    }

    assert_eq!(provider.fetch_calls.load(Ordering::Relaxed), tools.len() as u32);
}

#[tokio::test]
async fn test_unknown_ticker_maps_to_404_with_kind() {
    let (router, _, _) = test_app();

    let (status, body) = get(&router, "/tools/get_overview/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "unknown_ticker");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_screen_route_and_unknown_parameter() {
    let (router, _, _) = test_app();

    let (status, body) = post_json(
        &router,
        "/tools/screen",
        json!({ "criteria": [{ "parameter": "roe", "op": ">", "value": 15 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["matches"][0], "TCS");

    let (status, body) = post_json(
        &router,
        "/tools/screen",
        json!({ "criteria": [{ "parameter": "mystery", "op": ">", "value": 1 }] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "unknown_parameter");
}

#[tokio::test]
async fn test_list_screen_parameters() {
    let (router, _, _) = test_app();

    let (status, body) = get(&router, "/tools/list_screen_parameters").await;
    assert_eq!(status, StatusCode::OK);

    let parameters = body["parameters"].as_array().unwrap();
    assert!(!parameters.is_empty());
    assert!(parameters
        .iter()
        .any(|p| p["id"] == "roe" && p["unit"] == "percent"));
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let (router, _, _) = test_app();

    get(&router, "/tools/get_overview/INFY").await;
    get(&router, "/tools/get_overview/INFY").await;

    let (status, stats) = get(&router, "/tools/get_cache_stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["hit_count"], 1);
    assert_eq!(stats["miss_count"], 1);

    let (status, cleared) = post_empty(&router, "/tools/clear_cache").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["cleared_entries"], 1);
    assert!(cleared["ticker"].is_null());

    // Entries are gone; the counters survive the clear
    let (_, stats) = get(&router, "/tools/get_cache_stats").await;
    assert_eq!(stats["entries"], 0);
    assert_eq!(stats["hit_count"], 1);
    assert_eq!(stats["miss_count"], 1);
}

#[tokio::test]
async fn test_clear_cache_single_ticker() {
    let (router, _, _) = test_app();

    get(&router, "/tools/get_overview/INFY").await;
    get(&router, "/tools/get_overview/TCS").await;

    let (status, body) = post_json(&router, "/tools/clear_cache", json!({ "ticker": "infy" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared_entries"], 1);
    assert_eq!(body["ticker"], "INFY");

    let (_, stats) = get(&router, "/tools/get_cache_stats").await;
    assert_eq!(stats["entries"], 1);
}

#[tokio::test]
async fn test_login_status_lifecycle() {
    let (router, _, _) = test_app();

    let (_, body) = get(&router, "/tools/check_login_status").await;
    assert_eq!(body["status"], "logged_out");
    assert!(body["established_at"].is_null());

    get(&router, "/tools/get_overview/INFY").await;

    let (_, body) = get(&router, "/tools/check_login_status").await;
    assert_eq!(body["status"], "logged_in");
    assert!(body["established_at"].is_string());

    let (status, body) = post_empty(&router, "/tools/reset_session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "logged_out");
}

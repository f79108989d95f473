//! HTTP routes for the data service tool surface.
//!
//! Every operation returns either a JSON payload or a structured error of
//! the form `{ "error": { "kind": …, "message": … } }` where `kind` is a
//! stable discriminant; presentation is the caller's concern.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{normalize_ticker, AuthError, CacheStats, FetchError, ScreenError, Statement, StatementKind};
use crate::screen::{ScreenEngine, ScreenParameter, ScreenQuery};
use crate::session::SessionStatus;
use crate::DataState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    /// Matching tickers in upstream order (implementation-defined)
    pub matches: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ParametersResponse {
    pub parameters: &'static [ScreenParameter],
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheRequest {
    /// Clear only this ticker's entries; clears everything when absent
    #[serde(default)]
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared_entries: usize,
    pub ticker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginStatusResponse {
    pub status: SessionStatus,
    pub established_at: Option<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetSessionResponse {
    pub status: SessionStatus,
}

// ============================================================================
// Error Mapping
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// A tool error ready for the wire.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = serde_json::json!({ "error": self.body });
        (self.status, Json(payload)).into_response()
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        let status = match &err {
            FetchError::UnknownTicker(_) => StatusCode::NOT_FOUND,
            FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Auth(auth) => auth_status(auth),
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            body: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

impl From<ScreenError> for ApiError {
    fn from(err: ScreenError) -> Self {
        let status = match &err {
            ScreenError::UnknownParameter(_) | ScreenError::EmptyQuery => StatusCode::BAD_REQUEST,
            ScreenError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ScreenError::Auth(auth) => auth_status(auth),
            ScreenError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            body: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "sfin-data".to_string(),
    })
}

async fn statement(
    state: Arc<DataState>,
    ticker: String,
    kind: StatementKind,
) -> Result<Json<Statement>, ApiError> {
    let statement = state.statements.get_statement(&ticker, kind).await?;
    Ok(Json(statement))
}

/// Company overview: key ratios and market data
pub async fn get_overview(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::Overview).await
}

/// Annual income statement
pub async fn get_income_statement(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::Income).await
}

/// Balance sheet
pub async fn get_balance_sheet(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::BalanceSheet).await
}

/// Cash flow statement
pub async fn get_cash_flow(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::CashFlow).await
}

/// Quarterly results
pub async fn get_quarterly_results(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::Quarterly).await
}

/// Shareholding pattern
pub async fn get_shareholding(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::Shareholding).await
}

/// Sector peer comparison
pub async fn get_peer_comparison(
    State(state): State<Arc<DataState>>,
    Path(ticker): Path<String>,
) -> Result<Json<Statement>, ApiError> {
    statement(state, ticker, StatementKind::PeerComparison).await
}

/// Run a screening query
pub async fn screen(
    State(state): State<Arc<DataState>>,
    Json(query): Json<ScreenQuery>,
) -> Result<Json<ScreenResponse>, ApiError> {
    let matches = state.screener.screen(&query).await?;
    Ok(Json(ScreenResponse {
        count: matches.len(),
        matches,
    }))
}

/// List supported screening parameters
pub async fn list_screen_parameters() -> Json<ParametersResponse> {
    Json(ParametersResponse {
        parameters: ScreenEngine::list_parameters(),
    })
}

/// Cache statistics
pub async fn get_cache_stats(State(state): State<Arc<DataState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Clear the cache, entirely or for one ticker
pub async fn clear_cache(
    State(state): State<Arc<DataState>>,
    body: Option<Json<ClearCacheRequest>>,
) -> Json<ClearCacheResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    match request.ticker {
        Some(raw) => {
            let ticker = normalize_ticker(&raw);
            let cleared = state.cache.invalidate_ticker(&ticker);
            Json(ClearCacheResponse {
                cleared_entries: cleared,
                ticker: Some(ticker),
            })
        }
        None => Json(ClearCacheResponse {
            cleared_entries: state.cache.clear(),
            ticker: None,
        }),
    }
}

/// Upstream session status
pub async fn check_login_status(State(state): State<Arc<DataState>>) -> Json<LoginStatusResponse> {
    Json(LoginStatusResponse {
        status: state.session.status().await,
        established_at: state
            .session
            .established_at()
            .await
            .map(|t| t.to_rfc3339()),
        last_error: state.session.last_error().await.map(|e| e.to_string()),
    })
}

/// Drop the upstream session; the next data request logs in afresh
pub async fn reset_session(State(state): State<Arc<DataState>>) -> Json<ResetSessionResponse> {
    state.session.reset().await;
    Json(ResetSessionResponse {
        status: state.session.status().await,
    })
}

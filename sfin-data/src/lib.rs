//! SFin Data Library
//!
//! Cached, screened access to an upstream equity research website, exposed
//! as a set of tool operations over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    sfin-data (Rust Service)                 │
//! │                          :4460                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ Result Cache │  │   Session    │  │ Screen Engine    │   │
//! │  │  (TTL, lazy  │  │   Manager    │  │ (validate, then  │   │
//! │  │   eviction)  │  │ (one login)  │  │  dispatch)       │   │
//! │  └──────┬───────┘  └──────┬───────┘  └────────┬─────────┘   │
//! │         └─────────── Statement Service ───────┘             │
//! │                           │                                 │
//! │                 FundamentalsProvider trait                  │
//! │                  (ScreenerWeb over reqwest)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Invariants
//!
//! - A cache hit is side-effect-free: no session check, no upstream call.
//! - At most one upstream login attempt is ever in flight; concurrent
//!   requests await its outcome.
//! - Upstream failures are never cached and never mutate session state.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod routes;
pub mod screen;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use sfin_common::Config;

use crate::data::{Credentials, FundamentalsProvider, ResultCache, ScreenerWeb, StatementService};
use crate::screen::ScreenEngine;
use crate::session::SessionManager;

/// Data service state: the one cache, the one session, and the services
/// over them. Created once at startup and shared by every request.
pub struct DataState {
    /// Configuration
    pub config: Config,
    /// Result cache
    pub cache: Arc<ResultCache>,
    /// Upstream session manager
    pub session: Arc<SessionManager>,
    /// Statement access façade
    pub statements: StatementService,
    /// Screening dispatcher
    pub screener: ScreenEngine,
}

impl DataState {
    /// Create state backed by the real upstream website client.
    pub fn new(config: Config) -> Self {
        let provider: Arc<dyn FundamentalsProvider> = Arc::new(ScreenerWeb::new(&config.upstream));
        Self::with_provider(config, provider)
    }

    /// Create state over an injected provider. This is the seam tests use
    /// to run the full service against a fake upstream.
    pub fn with_provider(config: Config, provider: Arc<dyn FundamentalsProvider>) -> Self {
        let cache = Arc::new(match config.cache.max_entries {
            Some(max) => ResultCache::with_max_entries(max),
            None => ResultCache::new(),
        });
        let credentials = Credentials::from_config(&config.credentials);
        let session = Arc::new(SessionManager::new(Arc::clone(&provider), credentials));
        let statements = StatementService::new(
            Arc::clone(&provider),
            Arc::clone(&cache),
            Arc::clone(&session),
            config.cache.clone(),
        );
        let screener = ScreenEngine::new(Arc::clone(&provider), Arc::clone(&session));

        Self {
            config,
            cache,
            session,
            statements,
            screener,
        }
    }
}

/// Main data service.
pub struct DataService {
    state: Arc<DataState>,
}

impl DataService {
    /// Create a new data service.
    pub fn new(config: Config) -> Self {
        Self {
            state: Arc::new(DataState::new(config)),
        }
    }

    /// Create a service over pre-built state.
    pub fn with_state(state: Arc<DataState>) -> Self {
        Self { state }
    }

    /// Build the tool router over the given state.
    pub fn router(state: Arc<DataState>) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/tools/get_overview/:ticker", get(routes::get_overview))
            .route(
                "/tools/get_income_statement/:ticker",
                get(routes::get_income_statement),
            )
            .route(
                "/tools/get_balance_sheet/:ticker",
                get(routes::get_balance_sheet),
            )
            .route("/tools/get_cash_flow/:ticker", get(routes::get_cash_flow))
            .route(
                "/tools/get_quarterly_results/:ticker",
                get(routes::get_quarterly_results),
            )
            .route(
                "/tools/get_shareholding/:ticker",
                get(routes::get_shareholding),
            )
            .route(
                "/tools/get_peer_comparison/:ticker",
                get(routes::get_peer_comparison),
            )
            .route("/tools/screen", post(routes::screen))
            .route(
                "/tools/list_screen_parameters",
                get(routes::list_screen_parameters),
            )
            .route("/tools/get_cache_stats", get(routes::get_cache_stats))
            .route("/tools/clear_cache", post(routes::clear_cache))
            .route(
                "/tools/check_login_status",
                get(routes::check_login_status),
            )
            .route("/tools/reset_session", post(routes::reset_session))
            .with_state(state)
    }

    /// Start the data service.
    pub async fn start(self) -> Result<()> {
        let host = self.state.config.network.bind.clone();
        let port = self.state.config.data.port;
        let request_timeout = Duration::from_secs(self.state.config.data.request_timeout_secs);

        let app = Self::router(Arc::clone(&self.state)).layer(TimeoutLayer::new(request_timeout));

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

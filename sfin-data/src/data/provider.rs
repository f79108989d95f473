//! Upstream provider abstraction and error taxonomy.
//!
//! Defines the `FundamentalsProvider` trait the service depends on instead
//! of a concrete website client, plus the three error families every tool
//! operation can surface. Each error carries a stable `kind` discriminant
//! for the tool surface.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::screen::CompiledScreen;

use super::StatementKind;

// ============================================================================
// Credentials
// ============================================================================

/// Upstream account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Build from config, if both fields are configured.
    pub fn from_config(config: &sfin_common::CredentialsConfig) -> Option<Self> {
        match (&config.email, &config.password) {
            (Some(email), Some(password)) => Some(Self {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Errors during login or session establishment.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The upstream rejected the configured credentials
    #[error("Upstream rejected the configured credentials")]
    InvalidCredentials,

    /// No credentials are configured at all
    #[error("Upstream credentials are not configured")]
    MissingCredentials,

    /// Login rejected for a non-credential reason
    #[error("Login rejected: {0}")]
    Rejected(String),

    /// Login request timed out
    #[error("Login timed out")]
    Timeout,

    /// Network failure during login
    #[error("Network error during login: {0}")]
    Network(String),
}

impl AuthError {
    /// Whether the session manager may retry this failure once.
    ///
    /// Credential rejections are never retried automatically: repeated
    /// attempts with bad credentials risk an upstream account lockout.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }

    /// Stable discriminant for the tool surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::MissingCredentials => "missing_credentials",
            Self::Rejected(_) => "auth_rejected",
            Self::Timeout => "auth_timeout",
            Self::Network(_) => "auth_network",
        }
    }
}

/// Errors during a statement fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream has no company page for this ticker
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// The upstream call exceeded the configured timeout
    #[error("Upstream fetch timed out")]
    Timeout,

    /// Network failure reaching the upstream
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream answered but the response could not be parsed
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// The upstream answered with a non-success HTTP status
    #[error("Upstream error: HTTP {status}")]
    Upstream { status: u16 },

    /// Session establishment failed before the fetch could run
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FetchError {
    /// Stable discriminant for the tool surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTicker(_) => "unknown_ticker",
            Self::Timeout => "fetch_timeout",
            Self::Network(_) => "fetch_network",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Upstream { .. } => "upstream_error",
            Self::Auth(inner) => inner.kind(),
        }
    }
}

/// Errors during a screening query.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// A criterion names a parameter outside the supported registry
    #[error("Unknown screen parameter: {0}")]
    UnknownParameter(String),

    /// The query carries no criteria
    #[error("Screen query has no criteria")]
    EmptyQuery,

    /// The upstream rejected or failed the screen
    #[error("Upstream screen failed: {0}")]
    Upstream(String),

    /// The screen request exceeded the configured timeout
    #[error("Screen request timed out")]
    Timeout,

    /// Session establishment failed before the screen could run
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ScreenError {
    /// Stable discriminant for the tool surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownParameter(_) => "unknown_parameter",
            Self::EmptyQuery => "empty_query",
            Self::Upstream(_) => "screen_upstream",
            Self::Timeout => "screen_timeout",
            Self::Auth(inner) => inner.kind(),
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Capability interface over the upstream fundamentals website.
///
/// Kept deliberately narrow (login, fetch, screen) so the service core can
/// be exercised against a mock provider without network access.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Provider name for logs (e.g. "screener-web")
    fn name(&self) -> &'static str;

    /// Authenticate and establish an upstream session.
    async fn login(&self, credentials: &Credentials) -> Result<(), AuthError>;

    /// Fetch one statement for a ticker. The ticker is already normalized.
    async fn fetch_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Value, FetchError>;

    /// Run a compiled screening query, returning matching tickers in
    /// upstream order.
    async fn run_screen(&self, query: &CompiledScreen) -> Result<Vec<String>, ScreenError>;
}

// ============================================================================
// Tests
// ============================================================================

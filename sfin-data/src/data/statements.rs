//! Statement access façade.
//!
//! Every `get_*` tool resolves through the same path: fingerprint → cache →
//! session → upstream → cache write. A cache hit is side-effect-free; it
//! touches neither the session nor the upstream.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::session::SessionManager;

use super::{fingerprint, normalize_ticker, FetchError, FundamentalsProvider, ResultCache, StatementKind};

/// A retrieved statement, with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    /// Normalized ticker
    pub ticker: String,
    /// Statement kind
    pub kind: StatementKind,
    /// When the payload was fetched from the upstream
    pub fetched_at: DateTime<Utc>,
    /// Opaque payload: array-of-records for tables, object for the overview
    pub data: Value,
}

/// Cache-then-session-then-upstream statement service.
pub struct StatementService {
    provider: Arc<dyn FundamentalsProvider>,
    cache: Arc<ResultCache>,
    session: Arc<SessionManager>,
    ttl_policy: sfin_common::CacheConfig,
}

impl StatementService {
    pub fn new(
        provider: Arc<dyn FundamentalsProvider>,
        cache: Arc<ResultCache>,
        session: Arc<SessionManager>,
        ttl_policy: sfin_common::CacheConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            session,
            ttl_policy,
        }
    }

    /// Retrieve one statement for a ticker, serving from cache when a fresh
    /// entry exists.
    ///
    /// Upstream failures propagate without a cache write, so a transient
    /// error is never remembered as data.
    pub async fn get_statement(
        &self,
        ticker: &str,
        kind: StatementKind,
    ) -> Result<Statement, FetchError> {
        let ticker = normalize_ticker(ticker);
        let key = fingerprint(&ticker, kind);

        if let Some(hit) = self.cache.get(&key) {
            debug!(ticker = %ticker, kind = %kind, "Statement served from cache");
            return Ok(Statement {
                ticker,
                kind,
                fetched_at: hit.fetched_at,
                data: hit.payload,
            });
        }

        self.session.ensure_logged_in().await?;

        debug!(ticker = %ticker, kind = %kind, provider = self.provider.name(), "Fetching statement upstream");
        let data = self.provider.fetch_statement(&ticker, kind).await?;

        let ttl = Duration::seconds(self.ttl_policy.ttl_secs_for(kind.slug()) as i64);
        self.cache.put(&key, data.clone(), ttl);

        Ok(Statement {
            ticker,
            kind,
            fetched_at: Utc::now(),
            data,
        })
    }
}

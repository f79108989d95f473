//! Data access layer: statement kinds, fingerprints, cache, and the
//! upstream provider seam.
//!
//! The fetch path for every statement operation is cache → session →
//! upstream, implemented by [`StatementService`]. The upstream website is
//! reached only through the [`FundamentalsProvider`] trait so the whole
//! layer can be driven by an injected fake in tests.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod provider;
pub mod screener_web;
pub mod statements;

pub use cache::{CacheStats, CachedValue, ResultCache};
pub use provider::{AuthError, Credentials, FetchError, FundamentalsProvider, ScreenError};
pub use screener_web::ScreenerWeb;
pub use statements::{Statement, StatementService};

// ============================================================================
// Statement Kinds
// ============================================================================

/// The kinds of company data the service can retrieve.
///
/// Each kind maps to one tool operation and one section of the upstream
/// company page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Company snapshot: key ratios and market data
    Overview,
    /// Annual profit & loss statement
    Income,
    /// Balance sheet
    BalanceSheet,
    /// Cash flow statement
    CashFlow,
    /// Quarterly results
    Quarterly,
    /// Shareholding pattern (promoter, institutional, public)
    Shareholding,
    /// Peer comparison within the company's sector
    PeerComparison,
}

impl StatementKind {
    /// All kinds, in tool-surface order.
    pub const ALL: [StatementKind; 7] = [
        StatementKind::Overview,
        StatementKind::Income,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
        StatementKind::Quarterly,
        StatementKind::Shareholding,
        StatementKind::PeerComparison,
    ];

    /// Stable slug used in fingerprints, routes, and TTL policy keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Income => "income",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlow => "cash_flow",
            Self::Quarterly => "quarterly",
            Self::Shareholding => "shareholding",
            Self::PeerComparison => "peer_comparison",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ============================================================================
// Tickers and Fingerprints
// ============================================================================

/// Normalize a raw ticker: trim whitespace, uppercase.
///
/// Tickers compare case-insensitively upstream, so every key derivation
/// must go through this first.
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Deterministic cache key for a (ticker, kind) request.
///
/// Normalizes the ticker itself, so callers don't have to.
pub fn fingerprint(ticker: &str, kind: StatementKind) -> String {
    format!("{}:{}", normalize_ticker(ticker), kind.slug())
}

// ============================================================================
// Tests
// ============================================================================

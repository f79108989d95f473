//! Screening dispatcher.
//!
//! Translates a declarative conjunction of numeric criteria into the
//! upstream query language and returns the matching tickers. Validation
//! happens entirely before dispatch: a query naming an unknown parameter
//! never reaches the upstream. Screening results are not cached; a screen
//! reflects near-real-time upstream state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{FundamentalsProvider, ScreenError};
use crate::session::SessionManager;

pub mod params;

pub use params::{ScreenParameter, Unit, PARAMETERS};

// ============================================================================
// Query Model
// ============================================================================

/// Comparison operator in a screen criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
        }
    }
}

/// One numeric condition over a named financial parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenCriterion {
    /// Parameter id from the registry (see [`params`])
    pub parameter: String,
    pub op: Op,
    pub value: f64,
}

/// An ordered conjunction of criteria. All must hold (AND semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenQuery {
    pub criteria: Vec<ScreenCriterion>,
}

/// A validated query, translated into upstream query-language clauses.
#[derive(Debug, Clone)]
pub struct CompiledScreen {
    clauses: Vec<String>,
}

impl CompiledScreen {
    /// The full upstream query string.
    pub fn to_query_string(&self) -> String {
        self.clauses.join(" AND ")
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Screen Engine
// ============================================================================

/// Validates and dispatches screening queries.
pub struct ScreenEngine {
    provider: Arc<dyn FundamentalsProvider>,
    session: Arc<SessionManager>,
}

impl ScreenEngine {
    pub fn new(provider: Arc<dyn FundamentalsProvider>, session: Arc<SessionManager>) -> Self {
        Self { provider, session }
    }

    /// Validate a query against the parameter registry and translate it.
    ///
    /// Fails the whole query on the first unknown parameter; no partial
    /// execution.
    pub fn compile(query: &ScreenQuery) -> Result<CompiledScreen, ScreenError> {
        if query.criteria.is_empty() {
            return Err(ScreenError::EmptyQuery);
        }

        let mut clauses = Vec::with_capacity(query.criteria.len());
        for criterion in &query.criteria {
            let parameter = params::find(&criterion.parameter)
                .ok_or_else(|| ScreenError::UnknownParameter(criterion.parameter.clone()))?;

            clauses.push(format!(
                "{} {} {}",
                parameter.query_name,
                criterion.op.symbol(),
                format_value(criterion.value),
            ));
        }

        Ok(CompiledScreen { clauses })
    }

    /// Run a screen: validate, ensure a live session, dispatch.
    ///
    /// Result ordering is upstream-defined (an implementation-defined
    /// stable order, typically by the first criterion's metric); callers
    /// must not rely on a particular sort.
    pub async fn screen(&self, query: &ScreenQuery) -> Result<Vec<String>, ScreenError> {
        let compiled = Self::compile(query)?;

        self.session.ensure_logged_in().await?;

        debug!(query = %compiled.to_query_string(), "Dispatching screen upstream");
        self.provider.run_screen(&compiled).await
    }

    /// The supported-parameter registry.
    pub fn list_parameters() -> &'static [ScreenParameter] {
        PARAMETERS
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Integration tests for the screening dispatcher.
//!
//! Validation must reject bad queries before any upstream traffic, and
//! results are compared as sets: ordering belongs to the upstream.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use sfin_common::Config;
use sfin_data::data::{
    AuthError, Credentials, FetchError, FundamentalsProvider, ScreenError, StatementKind,
};
use sfin_data::screen::{CompiledScreen, Op, ScreenCriterion, ScreenQuery};
use sfin_data::DataState;

/// Provider that records the compiled queries it receives.
struct CapturingProvider {
    login_calls: AtomicU32,
    screen_calls: AtomicU32,
    last_query: Mutex<Option<String>>,
    fail_login: bool,
}

impl CapturingProvider {
    fn new() -> Self {
        Self {
            login_calls: AtomicU32::new(0),
            screen_calls: AtomicU32::new(0),
            last_query: Mutex::new(None),
            fail_login: false,
        }
    }

    fn failing_login() -> Self {
        Self {
            fail_login: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl FundamentalsProvider for CapturingProvider {
    fn name(&self) -> &'static str {
        "capturing"
    }

    async fn login(&self, _credentials: &Credentials) -> Result<(), AuthError> {
        self.login_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_login {
            Err(AuthError::InvalidCredentials)
        } else {
            Ok(())
        }
    }

    async fn fetch_statement(
        &self,
        _ticker: &str,
        _kind: StatementKind,
    ) -> Result<Value, FetchError> {
        Ok(Value::Null)
    }

    async fn run_screen(&self, query: &CompiledScreen) -> Result<Vec<String>, ScreenError> {
        self.screen_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_query.lock().unwrap() = Some(query.to_query_string());
        Ok(vec!["WIPRO".into(), "TCS".into(), "INFY".into()])
    }
}

fn test_state(provider: Arc<CapturingProvider>) -> DataState {
    let mut config = Config::default();
    config.credentials.email = Some("user@example.com".into());
    config.credentials.password = Some("hunter2".into());
    DataState::with_provider(config, provider)
}

fn criterion(parameter: &str, op: Op, value: f64) -> ScreenCriterion {
    ScreenCriterion {
        parameter: parameter.into(),
        op,
        value,
    }
}

#[tokio::test]
async fn test_unknown_parameter_fails_before_dispatch() {
    let provider = Arc::new(CapturingProvider::new());
    let state = test_state(provider.clone());

    let query = ScreenQuery {
        criteria: vec![
            criterion("roe", Op::Gt, 15.0),
            criterion("alpha_decay", Op::Lt, 1.0),
        ],
    };

    let err = state.screener.screen(&query).await.unwrap_err();
    match err {
        ScreenError::UnknownParameter(name) => assert_eq!(name, "alpha_decay"),
        other => panic!("expected UnknownParameter, got {other:?}"),
    }

    // Zero upstream traffic: no login, no screen call
    assert_eq!(provider.login_calls.load(Ordering::Relaxed), 0);
    assert_eq!(provider.screen_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let provider = Arc::new(CapturingProvider::new());
    let state = test_state(provider.clone());

    let err = state
        .screener
        .screen(&ScreenQuery { criteria: vec![] })
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenError::EmptyQuery));
    assert_eq!(provider.screen_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_dispatch_compiles_conjunction() {
    let provider = Arc::new(CapturingProvider::new());
    let state = test_state(provider.clone());

    let query = ScreenQuery {
        criteria: vec![
            criterion("roe", Op::Gt, 15.0),
            criterion("pe", Op::Lt, 20.0),
        ],
    };

    let matches = state.screener.screen(&query).await.unwrap();

    // Ordering is upstream-defined; compare as a set
    let got: HashSet<_> = matches.into_iter().collect();
    let expected: HashSet<String> = ["TCS", "INFY", "WIPRO"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(got, expected);

    let sent = provider.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(sent, "Return on equity > 15 AND Price to earning < 20");
}

#[tokio::test]
async fn test_screens_are_never_cached() {
    let provider = Arc::new(CapturingProvider::new());
    let state = test_state(provider.clone());

    let query = ScreenQuery {
        criteria: vec![criterion("roe", Op::Gt, 15.0)],
    };

    state.screener.screen(&query).await.unwrap();
    state.screener.screen(&query).await.unwrap();

    assert_eq!(provider.screen_calls.load(Ordering::Relaxed), 2);
    // And the result cache never saw them
    assert_eq!(state.cache.stats().entries, 0);
}

#[tokio::test]
async fn test_auth_failure_surfaces_as_screen_error() {
    let provider = Arc::new(CapturingProvider::failing_login());
    let state = test_state(provider.clone());

    let query = ScreenQuery {
        criteria: vec![criterion("roe", Op::Gt, 15.0)],
    };

    let err = state.screener.screen(&query).await.unwrap_err();
    assert!(matches!(err, ScreenError::Auth(_)));
    assert_eq!(provider.screen_calls.load(Ordering::Relaxed), 0);
}

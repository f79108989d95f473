//! Upstream session manager.
//!
//! Owns the single authenticated session to the upstream website. Login is
//! a critical section: only one attempt is ever in flight, and concurrent
//! callers await its outcome instead of racing their own attempts. A failed
//! session is sticky until an explicit reset, so the service never hammers
//! the upstream with bad credentials.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::data::{AuthError, Credentials, FundamentalsProvider};

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    Failed,
}

/// Internal session state, including what the status view omits.
#[derive(Debug, Clone)]
enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn { established_at: DateTime<Utc> },
    Failed { error: AuthError },
}

/// Process-wide session manager.
pub struct SessionManager {
    provider: Arc<dyn FundamentalsProvider>,
    credentials: Option<Credentials>,
    state: RwLock<SessionState>,
    /// Login critical section; concurrent callers queue here
    login_gate: Mutex<()>,
}

impl SessionManager {
    /// Create a manager in the `LoggedOut` state. The session is only
    /// established on the first data request.
    pub fn new(provider: Arc<dyn FundamentalsProvider>, credentials: Option<Credentials>) -> Self {
        Self {
            provider,
            credentials,
            state: RwLock::new(SessionState::LoggedOut),
            login_gate: Mutex::new(()),
        }
    }

    /// Guarantee a live upstream session.
    ///
    /// Idempotent when already logged in (read lock only, no upstream
    /// traffic). Transient failures are retried exactly once; any further
    /// failure transitions to `Failed`, which is sticky until [`reset`]
    /// (repeated automatic attempts with rejected credentials risk an
    /// upstream account lockout).
    ///
    /// [`reset`]: Self::reset
    pub async fn ensure_logged_in(&self) -> Result<(), AuthError> {
        if let Some(settled) = self.settled_outcome().await {
            return settled;
        }

        // Single attempt in flight; everyone else waits here and re-checks
        // the outcome the winner produced.
        let _gate = self.login_gate.lock().await;

        if let Some(settled) = self.settled_outcome().await {
            return settled;
        }

        let credentials = match &self.credentials {
            Some(c) => c.clone(),
            None => {
                let err = AuthError::MissingCredentials;
                *self.state.write().await = SessionState::Failed { error: err.clone() };
                return Err(err);
            }
        };

        *self.state.write().await = SessionState::LoggingIn;
        info!(provider = self.provider.name(), "Establishing upstream session");

        let outcome = match self.provider.login(&credentials).await {
            Err(first) if first.is_transient() => {
                warn!(error = %first, "Transient login failure, retrying once");
                self.provider.login(&credentials).await
            }
            other => other,
        };

        match outcome {
            Ok(()) => {
                *self.state.write().await = SessionState::LoggedIn {
                    established_at: Utc::now(),
                };
                info!("Upstream session established");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Login failed, session marked failed");
                *self.state.write().await = SessionState::Failed { error: err.clone() };
                Err(err)
            }
        }
    }

    /// Current status.
    pub async fn status(&self) -> SessionStatus {
        match &*self.state.read().await {
            SessionState::LoggedOut => SessionStatus::LoggedOut,
            SessionState::LoggingIn => SessionStatus::LoggingIn,
            SessionState::LoggedIn { .. } => SessionStatus::LoggedIn,
            SessionState::Failed { .. } => SessionStatus::Failed,
        }
    }

    /// When the current session was established, if logged in.
    pub async fn established_at(&self) -> Option<DateTime<Utc>> {
        match &*self.state.read().await {
            SessionState::LoggedIn { established_at } => Some(*established_at),
            _ => None,
        }
    }

    /// The stored failure, if the session is in the `Failed` state.
    pub async fn last_error(&self) -> Option<AuthError> {
        match &*self.state.read().await {
            SessionState::Failed { error } => Some(error.clone()),
            _ => None,
        }
    }

    /// Drop the session back to `LoggedOut`, clearing any stored failure.
    /// The next data request will attempt a fresh login.
    pub async fn reset(&self) {
        *self.state.write().await = SessionState::LoggedOut;
        info!("Session reset");
    }

    /// Resolve states that require no login attempt.
    async fn settled_outcome(&self) -> Option<Result<(), AuthError>> {
        match &*self.state.read().await {
            SessionState::LoggedIn { .. } => Some(Ok(())),
            SessionState::Failed { error } => Some(Err(error.clone())),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

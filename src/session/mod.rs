//! Session management for the remote API.
//!
//! [`SessionManager`] owns the cached session token, drives authentication
//! with retries, and recovers from session rejections on behalf of callers.
//! It is constructed once at the composition root, wrapped in an [`Arc`] and
//! handed to every consumer; tests build as many independent instances as
//! they like.

pub mod validator;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::api::retry::BackoffPolicy;
use crate::api::transport::{is_auth_operation, redact_token, Transport, OP_LOGOUT};
use crate::api::types::{ApiResponse, Params};
use crate::config::Config;
use crate::error::{Error, Result};

use self::validator::ValidatorHandle;

/// Number of consecutive login failures before one alert is raised.
const ALERT_AFTER_FAILURES: u32 = 3;

/// Mutable session state, guarded by the session lock.
///
/// `token` is either `None` or the value returned by the most recent
/// successful login; replacement is atomic under the lock.
#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    consecutive_auth_failures: u32,
    alert_raised: bool,
}

/// Shared manager for the remote API session.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    auth_policy: BackoffPolicy,
    call_timeout: Duration,
    validation_interval: Duration,
    state: Mutex<SessionState>,
    validator: Mutex<Option<ValidatorHandle>>,
}

impl SessionManager {
    /// Create a manager over `transport` using the configured timeouts.
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        Self::with_intervals(transport, config.call_timeout, config.validation_interval)
    }

    /// Create a manager with explicit timeouts.
    pub fn with_intervals(
        transport: Arc<dyn Transport>,
        call_timeout: Duration,
        validation_interval: Duration,
    ) -> Self {
        Self {
            transport,
            auth_policy: BackoffPolicy::for_auth(),
            call_timeout,
            validation_interval,
            state: Mutex::new(SessionState::default()),
            validator: Mutex::new(None),
        }
    }

    /// Guarantee a token is cached, authenticating if necessary.
    ///
    /// Idempotent: a present token is trusted as-is. Proactive validation is
    /// the job of the periodic validator and of session-error detection on
    /// demand; validating here would generate redundant login traffic.
    pub async fn ensure_session(&self) -> Result<()> {
        self.session_token().await.map(drop)
    }

    /// Invoke a remote operation with the configured default timeout.
    pub async fn call(&self, operation: &str, params: &Params) -> Result<ApiResponse> {
        self.call_with_timeout(operation, params, self.call_timeout)
            .await
    }

    /// Invoke a remote operation.
    ///
    /// A session rejection triggers exactly one invalidate / re-authenticate
    /// / retry cycle; a second rejection propagates unmodified. Transport
    /// retries have already been exhausted below this layer.
    pub async fn call_with_timeout(
        &self,
        operation: &str,
        params: &Params,
        timeout: Duration,
    ) -> Result<ApiResponse> {
        // Session-management operations carry no token and must not recurse
        // into token handling.
        if is_auth_operation(operation) {
            return self.transport.invoke(operation, params, None, timeout).await;
        }

        let token = self.session_token().await?;

        match self
            .transport
            .invoke(operation, params, Some(&token), timeout)
            .await
        {
            Err(Error::Session(message)) => {
                warn!(
                    "'{}' rejected session {}: {}; refreshing and retrying once",
                    operation,
                    redact_token(&token),
                    message
                );
                let fresh = self.refresh_after_rejection(&token).await?;
                self.transport
                    .invoke(operation, params, Some(&fresh), timeout)
                    .await
            }
            other => other,
        }
    }

    /// Force `token = None` without re-authenticating.
    pub async fn reset_session(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        debug!("session reset");
    }

    /// Close the remote session and drop the cached token.
    ///
    /// The token is cleared even when the remote call fails; a half-dead
    /// session is not worth keeping.
    pub async fn logout(&self) -> Result<bool> {
        let token = {
            let state = self.state.lock().await;
            state.token.clone()
        };
        let Some(token) = token else {
            return Ok(true);
        };

        let result = self
            .transport
            .invoke(OP_LOGOUT, &Params::new(), Some(&token), self.call_timeout)
            .await;
        self.reset_session().await;

        result.map(|body| body.success)
    }

    /// Snapshot of the cached token, if any.
    pub async fn current_token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    /// Return the cached token, authenticating first when absent.
    ///
    /// The lock serializes authentication: when several callers race on a
    /// missing token, one logs in and the rest observe the populated token.
    async fn session_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        match &state.token {
            Some(token) => Ok(token.clone()),
            None => self.authenticate_locked(&mut state).await,
        }
    }

    /// Invalidate a rejected token and obtain a replacement.
    ///
    /// Only drops the cached token if it is still the one that failed;
    /// another task may have refreshed it already, in which case that
    /// replacement is used as-is.
    async fn refresh_after_rejection(&self, rejected: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        if state.token.as_deref() == Some(rejected) {
            state.token = None;
        }
        match &state.token {
            Some(token) => Ok(token.clone()),
            None => self.authenticate_locked(&mut state).await,
        }
    }

    /// Authentication retry state machine. Caller must hold the session lock.
    ///
    /// Bad credentials and transport failures both consume an attempt and
    /// extend the failure streak; protocol errors surface immediately. Each
    /// failed attempt sleeps the backoff delay before the next one (or before
    /// the aggregate error on exhaustion). Sleeping while holding the lock is
    /// acceptable: authentication is infrequent and deliberately serialized.
    async fn authenticate_locked(&self, state: &mut SessionState) -> Result<String> {
        let mut delay: Option<Duration> = None;
        let mut last_error = String::new();
        let max = self.auth_policy.max_attempts;

        for attempt in 1..=max {
            debug!("login attempt {}/{}", attempt, max);
            match self.transport.login().await {
                Ok(token) => {
                    state.token = Some(token.clone());
                    state.consecutive_auth_failures = 0;
                    state.alert_raised = false;
                    info!("authenticated, session {}", redact_token(&token));
                    return Ok(token);
                }
                Err(e) if e.is_auth_retriable() => {
                    state.consecutive_auth_failures += 1;
                    last_error = e.to_string();
                    warn!(
                        "login attempt {}/{} failed: {} (streak: {})",
                        attempt, max, e, state.consecutive_auth_failures
                    );

                    if state.consecutive_auth_failures >= ALERT_AFTER_FAILURES
                        && !state.alert_raised
                    {
                        self.raise_alert(state.consecutive_auth_failures, &last_error);
                        state.alert_raised = true;
                    }

                    let next = self.auth_policy.next_delay(delay);
                    delay = Some(next);
                    debug!("retrying login in {:?}", next);
                    sleep(next).await;
                }
                Err(e) => return Err(e),
            }
        }

        error!("login failed after {} attempts", max);
        Err(Error::AuthExhausted {
            attempts: max,
            message: last_error,
        })
    }

    /// Escalate a login failure streak.
    ///
    /// Extension point for external notification (email, chat, paging); for
    /// now the escalation is a log record. Raised at most once per streak.
    fn raise_alert(&self, failures: u32, last_error: &str) {
        error!(
            "ALERT: login has failed {} consecutive times, last error: {}",
            failures, last_error
        );
    }

    #[cfg(test)]
    async fn debug_state(&self) -> (Option<String>, u32, bool) {
        let state = self.state.lock().await;
        (
            state.token.clone(),
            state.consecutive_auth_failures,
            state.alert_raised,
        )
    }
}

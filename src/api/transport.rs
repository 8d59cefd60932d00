//! HTTP transport for the remote subscriber-management API.
//!
//! Performs exactly one form-encoded POST per operation and classifies the
//! outcome. Owns no session state; any number of tasks may call it
//! concurrently without coordination.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::api::credentials::Credentials;
use crate::api::retry::{retry, BackoffPolicy};
use crate::api::types::{ApiResponse, Params};
use crate::error::{Error, Result};
use crate::VERSION;

/// Remote operation name for login.
pub const OP_LOGIN: &str = "login";
/// Remote operation name for the session-validity probe.
pub const OP_LOGGED_IN: &str = "cvLoggedIn";
/// Remote operation name for logout.
pub const OP_LOGOUT: &str = "cvLogout";

/// Timeout for login and session-check round trips.
const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Substrings in a failure message that mark it as a session error.
///
/// Inherently fragile, kept for wire compatibility; isolated here so a
/// structured error-code check can replace it if the upstream API improves.
/// Known to both over- and under-match.
const SESSION_ERROR_MARKERS: [&str; 4] = ["session", "logged", "permission", "do not have"];

/// Error code the remote uses for an authorization-scope rejection.
///
/// Explicitly NOT a session error: the token is still valid and must not be
/// invalidated, or every scope miss would trigger a re-authentication storm.
const PERMISSION_ERROR_CODE: &str = "no_access_to_function";

/// True for operations that manage the session itself and therefore bypass
/// all token handling.
pub fn is_auth_operation(operation: &str) -> bool {
    operation == OP_LOGIN || operation == OP_LOGGED_IN
}

/// Classify a `success == false` response body.
pub(crate) fn classify_failure(operation: &str, message: &str, code: Option<&str>) -> Error {
    if code == Some(PERMISSION_ERROR_CODE) {
        return Error::Permission(message.to_string());
    }

    let lower = message.to_lowercase();
    if SESSION_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        Error::Session(message.to_string())
    } else {
        Error::Protocol(format!("'{operation}' failed: {message}"))
    }
}

/// Truncate a token for logging. Full token values never reach the logs.
pub fn redact_token(token: &str) -> String {
    if token.chars().count() > 12 {
        let prefix: String = token.chars().take(8).collect();
        format!("{prefix}...")
    } else {
        "[redacted]".to_string()
    }
}

/// Copy of `params` safe to log: secret-bearing values are masked.
fn redacted_params(params: &Params) -> Params {
    params
        .iter()
        .map(|(k, v)| {
            let value = match k.as_str() {
                "sessionId" | "password" | "apiToken" => redact_token(v),
                _ => v.clone(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// A single request/response round trip against the remote API.
///
/// The seam between the session manager and the network; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Authenticate and return a fresh session token.
    ///
    /// Bad credentials are an [`Error::Authentication`] and are not retried
    /// at this layer; the caller owns the authentication retry budget.
    async fn login(&self) -> Result<String>;

    /// Check whether `token` is still accepted by the remote side.
    ///
    /// An invalid session is communicated as `Ok(false)`, never an error;
    /// errors are reserved for transport and protocol failures.
    async fn check_session(&self, token: &str) -> Result<bool>;

    /// Invoke a remote operation, attaching `token` when present.
    async fn invoke(
        &self,
        operation: &str,
        params: &Params,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<ApiResponse>;
}

/// Transport implementation over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
    retry_policy: BackoffPolicy,
}

impl HttpTransport {
    /// Create a new transport for `base_url`.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("cas-session/{VERSION}"))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
            retry_policy: BackoffPolicy::for_transport(),
        })
    }

    /// Perform one POST and parse the response envelope.
    async fn post(&self, operation: &str, form: &Params, timeout: Duration) -> Result<ApiResponse> {
        let url = format!(
            "{}?f={}&requestMode=function",
            self.base_url.trim_end_matches('/'),
            operation
        );

        let response = self
            .client
            .post(&url)
            .form(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(operation, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("'{}' returned HTTP {}: {}", operation, status, body);
            return Err(Error::Protocol(format!(
                "'{operation}' returned HTTP {status}"
            )));
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| Error::Protocol(format!("invalid response body for '{operation}': {e}")))
    }
}

/// Map a reqwest send error to the transport taxonomy.
fn map_send_error(operation: &str, timeout: Duration, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(operation, timeout.as_secs())
    } else if e.is_connect() || e.is_request() {
        Error::connection(operation, e.to_string())
    } else {
        Error::Protocol(format!("request failure for '{operation}': {e}"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn login(&self) -> Result<String> {
        let mut form = Params::new();
        form.insert("username".to_string(), self.credentials.username.clone());
        form.insert("password".to_string(), self.credentials.password_hash());
        form.insert("apiToken".to_string(), self.credentials.api_token.clone());

        debug!("logging in as '{}'", self.credentials.username);

        let body = self.post(OP_LOGIN, &form, AUTH_TIMEOUT).await?;

        if !body.success {
            let message = body
                .error_message
                .unwrap_or_else(|| "login rejected without a message".to_string());
            warn!("login rejected: {}", message);
            return Err(Error::Authentication(message));
        }

        match body.answer_as_str() {
            Some(token) if !token.is_empty() => {
                debug!("login succeeded, token {}", redact_token(token));
                Ok(token.to_string())
            }
            _ => Err(Error::Protocol(
                "login succeeded but no token in response".to_string(),
            )),
        }
    }

    async fn check_session(&self, token: &str) -> Result<bool> {
        let mut form = Params::new();
        form.insert("sessionId".to_string(), token.to_string());

        debug!("checking session {}", redact_token(token));

        let body = self.post(OP_LOGGED_IN, &form, AUTH_TIMEOUT).await?;

        if !body.success {
            debug!(
                "session check reported failure: {}",
                body.error_message.as_deref().unwrap_or("no message")
            );
            return Ok(false);
        }

        Ok(body.answer_as_bool())
    }

    async fn invoke(
        &self,
        operation: &str,
        params: &Params,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<ApiResponse> {
        let mut form = params.clone();
        if let Some(token) = token {
            form.insert("sessionId".to_string(), token.to_string());
        }

        debug!(
            "invoking '{}' with params {:?}",
            operation,
            redacted_params(&form)
        );

        // Transient failures are absorbed here; everything else surfaces to
        // the session manager unretried.
        retry(
            || async {
                let body = self.post(operation, &form, timeout).await?;

                if !body.success {
                    let message = body
                        .error_message
                        .as_deref()
                        .unwrap_or("unknown error")
                        .to_string();
                    warn!("'{}' failed: {}", operation, message);
                    return Err(classify_failure(operation, &message, body.error_code.as_deref()));
                }

                debug!("'{}' succeeded", operation);
                Ok(body)
            },
            Error::is_transport,
            &self.retry_policy,
            operation,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_session_errors_by_substring() {
        for message in [
            "Session expired",
            "you are not LOGGED in",
            "insufficient permission",
            "you do not have access to this module",
        ] {
            let err = classify_failure("cvGetSubscriber", message, None);
            assert!(matches!(err, Error::Session(_)), "{message}");
        }
    }

    #[test]
    fn test_classify_explicit_permission_code() {
        let err = classify_failure(
            "cvGetSubscriber",
            "You do not have access to this function",
            Some("no_access_to_function"),
        );
        // The code wins over the substring match; the token stays valid.
        assert!(matches!(err, Error::Permission(_)));
    }

    #[test]
    fn test_classify_other_failures_as_protocol() {
        let err = classify_failure("cvGetSubscriber", "internal server fault", None);
        assert!(matches!(err, Error::Protocol(_)));

        let err = classify_failure("cvGetSubscriber", "quota exceeded", Some("quota"));
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_is_auth_operation() {
        assert!(is_auth_operation(OP_LOGIN));
        assert!(is_auth_operation(OP_LOGGED_IN));
        assert!(!is_auth_operation(OP_LOGOUT));
        assert!(!is_auth_operation("cvGetSubscriber"));
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(redact_token("short"), "[redacted]");
        assert_eq!(redact_token(""), "[redacted]");
    }

    #[test]
    fn test_redacted_params_masks_secrets() {
        let mut params = Params::new();
        params.insert("sessionId".to_string(), "abcdefghijklmnop".to_string());
        params.insert("smartcardId".to_string(), "12345".to_string());

        let redacted = redacted_params(&params);
        assert_eq!(redacted["sessionId"], "abcdefgh...");
        assert_eq!(redacted["smartcardId"], "12345");
    }
}

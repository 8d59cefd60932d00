//! Error types for the CAS session client.

use thiserror::Error;

/// Result type alias for session client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the session client.
///
/// Application code only ever sees these kinds; raw transport errors and
/// retry bookkeeping are absorbed before an error is returned.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Authentication =====
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authentication failed after {attempts} attempts: {message}")]
    AuthExhausted { attempts: u32, message: String },

    // ===== Session / authorization =====
    #[error("session rejected by remote: {0}")]
    Session(String),

    #[error("permission denied: {0}")]
    Permission(String),

    // ===== Transport =====
    #[error("timeout after {seconds}s calling '{operation}'")]
    Timeout { operation: String, seconds: u64 },

    #[error("connection error calling '{operation}': {message}")]
    Connection { operation: String, message: String },

    // ===== Protocol =====
    #[error("protocol error: {0}")]
    Protocol(String),

    // ===== Configuration =====
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a timeout error for an operation.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Create a connection error for an operation.
    pub fn connection(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check if this is a transport-level failure (connectivity or timeout).
    ///
    /// Transport failures are the only retriable class: they are absorbed
    /// with backoff up to the configured budget at both the login and
    /// per-call layers.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }

    /// Check if this failure counts against the authentication retry budget.
    ///
    /// Bad credentials and transport failures both count; protocol errors
    /// surface immediately.
    pub fn is_auth_retriable(&self) -> bool {
        matches!(self, Self::Authentication(_)) || self.is_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth = Error::Authentication("invalid api token".to_string());
        assert_eq!(auth.to_string(), "authentication failed: invalid api token");

        let exhausted = Error::AuthExhausted {
            attempts: 5,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            exhausted.to_string(),
            "authentication failed after 5 attempts: connection refused"
        );

        let timeout = Error::timeout("cvGetSubscriber", 60);
        assert_eq!(
            timeout.to_string(),
            "timeout after 60s calling 'cvGetSubscriber'"
        );
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::timeout("login", 30).is_transport());
        assert!(Error::connection("login", "refused").is_transport());

        assert!(!Error::Authentication("bad".to_string()).is_transport());
        assert!(!Error::Session("expired".to_string()).is_transport());
        assert!(!Error::Permission("no access".to_string()).is_transport());
        assert!(!Error::Protocol("garbage body".to_string()).is_transport());
    }

    #[test]
    fn test_is_auth_retriable() {
        assert!(Error::Authentication("bad credentials".to_string()).is_auth_retriable());
        assert!(Error::timeout("login", 30).is_auth_retriable());
        assert!(Error::connection("login", "reset").is_auth_retriable());

        assert!(!Error::Protocol("unexpected body".to_string()).is_auth_retriable());
        assert!(!Error::Session("expired".to_string()).is_auth_retriable());
        assert!(!Error::Config("missing CAS_USERNAME".to_string()).is_auth_retriable());
    }
}

//! Configuration for the CAS session client.
//!
//! All values come from the environment (or a `.env` file loaded by the
//! binary) with CLI overrides. Required values are validated once at startup;
//! a missing credential is a fatal configuration error, never retried.

use clap::Parser;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default per-call timeout in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Default background validation interval: 4 hours.
pub const DEFAULT_VALIDATION_INTERVAL_SECS: u64 = 14_400;

/// Command-line arguments for the session client.
#[derive(Parser, Debug, Clone)]
#[command(name = "cas-session")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Session-managed client for a CAS subscriber-management API")]
pub struct Args {
    /// Base URL of the remote API
    #[arg(long, env = "CAS_BASE_URL")]
    pub base_url: Option<String>,

    /// API username
    #[arg(long, env = "CAS_USERNAME")]
    pub username: Option<String>,

    /// API password (hashed before it goes on the wire)
    #[arg(long, env = "CAS_PASSWORD")]
    pub password: Option<String>,

    /// API token issued for this integration
    #[arg(long, env = "CAS_API_TOKEN")]
    pub api_token: Option<String>,

    /// Salt applied to the password hash
    #[arg(long, env = "CAS_SALT")]
    pub salt: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT_SECS, env = "CAS_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: u64,

    /// Background session validation interval in seconds
    #[arg(long, default_value_t = DEFAULT_VALIDATION_INTERVAL_SECS, env = "CAS_VALIDATION_INTERVAL_SECS")]
    pub validation_interval_secs: u64,

    /// Enable debug logging
    #[arg(short, long, env = "CAS_DEBUG")]
    pub debug: bool,

    /// Remote operation to invoke (e.g. 'cvGetSubscriber')
    pub operation: Option<String>,

    /// Operation parameters as key=value pairs
    #[arg(short, long = "param")]
    pub params: Vec<String>,
}

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote API
    pub base_url: String,
    /// API username
    pub username: String,
    /// API password, plain; hashed at login time
    pub password: String,
    /// API token
    pub api_token: String,
    /// Password hash salt
    pub salt: String,
    /// Per-call timeout
    pub call_timeout: Duration,
    /// Background validation interval
    pub validation_interval: Duration,
    /// Debug mode
    pub debug: bool,
}

impl Config {
    /// Build a validated configuration from parsed arguments.
    ///
    /// Every missing required value is reported in a single error so an
    /// operator can fix the environment in one pass.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut missing = Vec::new();

        let required = [
            ("CAS_BASE_URL", &args.base_url),
            ("CAS_USERNAME", &args.username),
            ("CAS_PASSWORD", &args.password),
            ("CAS_API_TOKEN", &args.api_token),
            ("CAS_SALT", &args.salt),
        ];
        for (name, value) in &required {
            if value.as_deref().map_or(true, str::is_empty) {
                missing.push(*name);
            }
        }

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            base_url: args.base_url.clone().unwrap_or_default(),
            username: args.username.clone().unwrap_or_default(),
            password: args.password.clone().unwrap_or_default(),
            api_token: args.api_token.clone().unwrap_or_default(),
            salt: args.salt.clone().unwrap_or_default(),
            call_timeout: Duration::from_secs(args.call_timeout_secs),
            validation_interval: Duration::from_secs(args.validation_interval_secs),
            debug: args.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_args() -> Args {
        Args {
            base_url: Some("https://cas.example.com/api".to_string()),
            username: Some("reporting".to_string()),
            password: Some("hunter2".to_string()),
            api_token: Some("tok-123".to_string()),
            salt: Some("pepper".to_string()),
            call_timeout_secs: 60,
            validation_interval_secs: 14_400,
            debug: false,
            operation: None,
            params: vec![],
        }
    }

    #[test]
    fn test_config_from_complete_args() {
        let config = Config::from_args(&full_args()).unwrap();

        assert_eq!(config.base_url, "https://cas.example.com/api");
        assert_eq!(config.username, "reporting");
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert_eq!(config.validation_interval, Duration::from_secs(14_400));
        assert!(!config.debug);
    }

    #[test]
    fn test_config_reports_all_missing_fields() {
        let mut args = full_args();
        args.username = None;
        args.api_token = Some(String::new());

        let err = Config::from_args(&args).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("CAS_USERNAME"));
        assert!(message.contains("CAS_API_TOKEN"));
        assert!(!message.contains("CAS_BASE_URL"));
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_intervals() {
        assert_eq!(DEFAULT_CALL_TIMEOUT_SECS, 60);
        // 4 hours
        assert_eq!(DEFAULT_VALIDATION_INTERVAL_SECS, 4 * 60 * 60);
    }
}

//! One-shot CLI for the CAS session client.
//!
//! Loads configuration from the environment, performs a single remote
//! operation through the session manager and prints the answer as JSON.
//! Real consumers embed the library; this exists for operational poking.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cas_session::api::{Credentials, HttpTransport, Params};
use cas_session::config::{Args, Config};
use cas_session::error::{Error, Result};
use cas_session::session::SessionManager;
use cas_session::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = Config::from_args(&args)?;
    let operation = args
        .operation
        .clone()
        .ok_or_else(|| Error::Config("no operation given".to_string()))?;
    let params = parse_params(&args.params)?;

    info!("cas-session v{}", VERSION);

    let transport = HttpTransport::new(config.base_url.clone(), Credentials::from_config(&config))?;
    let manager = Arc::new(SessionManager::new(Arc::new(transport), &config));

    let response = manager.call(&operation, &params).await?;

    let answer = response.answer.unwrap_or(serde_json::Value::Null);
    let rendered = serde_json::to_string_pretty(&answer)
        .map_err(|e| Error::Protocol(format!("failed to render answer: {e}")))?;
    println!("{rendered}");

    Ok(())
}

/// Parse `key=value` pairs from the command line.
fn parse_params(pairs: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("invalid parameter '{pair}', expected key=value")))?;
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}

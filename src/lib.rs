//! Session-managed client for a conditional-access subscriber-management API.
//!
//! The remote API exposes opaque operations behind a token-based session.
//! This crate owns the lifecycle of that token: obtaining it, caching it,
//! revalidating it in the background, and transparently re-authenticating
//! when the remote side rejects it.
//!
//! # Architecture
//!
//! - **API layer** (`api`) - transport over reqwest, wire types, backoff and
//!   retry, credentials
//! - **Session layer** (`session`) - the shared [`session::SessionManager`]
//!   and its periodic background validator
//! - **Configuration** (`config`) - environment-backed settings, validated
//!   once at startup
//!
//! # Usage
//!
//! Construct one [`session::SessionManager`] at the composition root, wrap
//! it in an `Arc` and inject it everywhere a remote call is made. Callers
//! only see [`Error`] kinds, never raw network failures or retry
//! bookkeeping.

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use error::{Error, Result};

/// Crate version reported in the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

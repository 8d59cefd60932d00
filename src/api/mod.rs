//! Transport layer for the remote subscriber-management API.
//!
//! - `credentials` - login credentials and password hashing
//! - `retry` - exponential backoff policy and retry driver
//! - `transport` - the `Transport` seam and its reqwest implementation
//! - `types` - wire envelope types

pub mod credentials;
pub mod retry;
pub mod transport;
pub mod types;

pub use credentials::Credentials;
pub use retry::BackoffPolicy;
pub use transport::{is_auth_operation, redact_token, HttpTransport, Transport};
pub use types::{ApiResponse, Params};

//! Retry logic with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Parameters for exponential backoff.
///
/// Pure and deterministic: no jitter is applied. That is a deliberate
/// simplicity choice; jitter can be added later without changing the
/// observable contract.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound on any single delay
    pub max: Duration,
    /// Maximum number of attempts before giving up
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Policy for authentication retries: 1s initial, 60s cap, 5 attempts.
    pub fn for_auth() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            max_attempts: 5,
        }
    }

    /// Policy for per-call transport retries: 2s initial, 30s cap, 3 attempts.
    pub fn for_transport() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(30),
            max_attempts: 3,
        }
    }

    /// Compute the delay following `previous`.
    ///
    /// The sequence is seeded by `initial` and doubles up to `max`, so it is
    /// monotonically non-decreasing and bounded.
    pub fn next_delay(&self, previous: Option<Duration>) -> Duration {
        match previous {
            None => self.initial,
            Some(prev) => (prev * 2).min(self.max),
        }
    }
}

/// Retry a fallible async operation with exponential backoff.
///
/// `can_retry` decides whether an error is transient; non-retriable errors
/// and the final attempt's error are returned as-is. Sleeps between attempts
/// but never after the last one.
pub async fn retry<F, Fut, T, E, R>(
    mut f: F,
    can_retry: R,
    policy: &BackoffPolicy,
    what: &str,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut delay: Option<Duration> = None;
    let mut attempt = 0u32;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("'{}' succeeded after {} transient failures", what, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                attempt += 1;

                if attempt >= policy.max_attempts || !can_retry(&e) {
                    return Err(e);
                }

                let next = policy.next_delay(delay);
                delay = Some(next);

                debug!(
                    "'{}' failed ({}), retrying in {:?} (attempt {}/{})",
                    what, e, next, attempt, policy.max_attempts
                );
                sleep(next).await;
            }
        }
    }
}

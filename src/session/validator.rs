//! Background session revalidation.
//!
//! A single supervised task wakes on a fixed interval, probes the cached
//! token against the remote side and refreshes it when stale, so foreground
//! traffic rarely observes a session rejection. The loop has no caller to
//! report to: every failure is logged and the next cycle tries again.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Error;

use super::SessionManager;

/// Bound on how long `stop_validator` waits for the loop to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the running validation task.
#[derive(Debug)]
pub(super) struct ValidatorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionManager {
    /// Launch the periodic validator.
    ///
    /// Exactly one task runs at a time; calling this while one is already
    /// running warns and does nothing.
    pub async fn start_validator(self: &Arc<Self>) {
        let mut slot = self.validator.lock().await;

        if let Some(handle) = slot.as_ref() {
            if !handle.task.is_finished() {
                warn!("periodic validator is already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(self).validation_loop(cancel.clone()));
        *slot = Some(ValidatorHandle { cancel, task });

        info!(
            "periodic validator started (interval: {:?})",
            self.validation_interval
        );
    }

    /// Signal the validator to stop and wait for it, bounded.
    ///
    /// If the loop does not exit within the bound it is abandoned with a
    /// warning; it holds no unique resources beyond the session lock, which
    /// it releases between cycles.
    pub async fn stop_validator(&self) {
        let handle = self.validator.lock().await.take();
        let Some(ValidatorHandle { cancel, task }) = handle else {
            return;
        };

        cancel.cancel();
        match timeout(STOP_TIMEOUT, task).await {
            Ok(_) => debug!("periodic validator stopped"),
            Err(_) => warn!(
                "periodic validator did not stop within {:?}, abandoning it",
                STOP_TIMEOUT
            ),
        }
    }

    /// Whether a validator task is currently running.
    pub async fn validator_running(&self) -> bool {
        self.validator
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    async fn validation_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            // Interruptible wait: cancellation must not sit out the interval.
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.validation_interval) => {}
            }
            self.validate_once().await;
        }
        debug!("periodic validation loop exited");
    }

    /// One validation cycle. Never fails out; all errors end up in the log.
    ///
    /// Holds the session lock across the check-and-refresh so a foreground
    /// re-authentication cannot race the background one.
    pub async fn validate_once(&self) {
        let mut state = self.state.lock().await;

        let Some(token) = state.token.clone() else {
            debug!("no session to validate");
            return;
        };

        match self.transport.check_session(&token).await {
            Ok(true) => debug!("session still valid"),
            Ok(false) => {
                info!("session expired, refreshing");
                if let Err(e) = self.authenticate_locked(&mut state).await {
                    error!("failed to refresh expired session: {}", e);
                }
            }
            // Transient blip: the token may well still be valid, keep it.
            Err(e) if e.is_transport() => {
                warn!("session check hit a transport error, keeping token: {}", e);
            }
            // Authorization scope issue, unrelated to token validity.
            Err(Error::Permission(message)) => {
                debug!(
                    "permission error during session check, keeping token: {}",
                    message
                );
            }
            Err(e) => {
                warn!("session check failed ({}), attempting refresh", e);
                if let Err(e) = self.authenticate_locked(&mut state).await {
                    error!("failed to refresh session: {}", e);
                }
            }
        }
    }
}

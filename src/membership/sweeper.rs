//! Periodic expiry sweep.
//!
//! The sweeper is a thin timer around
//! [`MembershipEngine::expire_due_subscriptions`]: it decides nothing itself.
//! A failed pass is logged and the schedule keeps running; shutdown is
//! cooperative, with a bounded wait for an in-flight pass.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::engine::MembershipEngine;

/// Sweep schedule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Delay before the first pass.
    #[serde(default = "default_initial_delay_seconds")]
    pub initial_delay_seconds: u64,
    /// Time between passes.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// How long `shutdown` waits for an in-flight pass before aborting.
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

fn default_initial_delay_seconds() -> u64 {
    10
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_shutdown_timeout_seconds() -> u64 {
    5
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            initial_delay_seconds: default_initial_delay_seconds(),
            interval_seconds: default_interval_seconds(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
        }
    }
}

/// Handle to a running expiry sweeper task.
pub struct ExpirySweeper {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl ExpirySweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    #[must_use]
    pub fn start(engine: Arc<MembershipEngine>, config: SweeperConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let initial_delay = Duration::from_secs(config.initial_delay_seconds);
        let interval = Duration::from_secs(config.interval_seconds);
        let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);

        let handle = tokio::spawn(async move {
            tracing::info!(
                initial_delay_seconds = initial_delay.as_secs(),
                interval_seconds = interval.as_secs(),
                "Expiry sweeper started"
            );

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Expiry sweeper stopped before first pass");
                    return;
                }
                _ = tokio::time::sleep(initial_delay) => {}
            }

            loop {
                match engine.expire_due_subscriptions().await {
                    Ok(0) => tracing::debug!("Expiry sweep pass found nothing due"),
                    Ok(expired) => {
                        tracing::info!(expired, "Expiry sweep pass expired subscriptions");
                    }
                    // Keep the schedule alive; the next pass will retry.
                    Err(e) => tracing::error!(error = %e, "Expiry sweep pass failed"),
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            tracing::info!("Expiry sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle,
            shutdown_timeout,
        }
    }

    /// Request cancellation and wait for the loop to finish.
    ///
    /// An in-flight pass is allowed to complete; if it does not within the
    /// configured timeout the task is aborted.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;

        let mut handle = self.handle;
        match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
            Ok(_) => tracing::debug!("Expiry sweeper shut down cleanly"),
            Err(_) => {
                tracing::warn!(
                    timeout_seconds = self.shutdown_timeout.as_secs(),
                    "Expiry sweeper did not stop within timeout, aborting"
                );
                handle.abort();
            }
        }
    }

    /// Whether the sweep loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

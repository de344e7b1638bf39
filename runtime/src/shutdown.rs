//! Graceful shutdown coordination.
//!
//! ## Architecture
//!
//! - **`ShutdownCoordinator`**: Owns the cancellation flag and the grace period
//! - **`ShutdownSignal`**: Handed to loops; resolves once shutdown starts
//! - **`wait_for_signal()`**: Waits for SIGTERM or Ctrl+C
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
//! let task = tokio::spawn(bakery.bake(coordinator.subscribe(), interval));
//!
//! wait_for_signal().await?;
//! coordinator.shutdown_and_wait(task).await?;
//! ```

use crate::error::ShutdownError;
use octomuffin_core::shutdown::ShutdownSignal;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Coordinates shutdown of the tasks subscribed to it
///
/// - Broadcasts a single cancellation flag to every subscriber
/// - Bounds how long a task may take to wind down
/// - Aborts tasks that overrun the grace period
pub struct ShutdownCoordinator {
    shutdown_tx: watch::Sender<bool>,
    timeout_duration: Duration,
}

impl ShutdownCoordinator {
    /// Create new shutdown coordinator
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait for a task to finish after shutdown starts
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            shutdown_tx,
            timeout_duration: timeout,
        }
    }

    /// Get a signal that resolves when shutdown starts
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal::from_receiver(self.shutdown_tx.subscribe())
    }

    /// Start shutdown. Idempotent.
    pub fn shutdown(&self) {
        let already = self.shutdown_tx.send_replace(true);
        if !already {
            info!(
                subscribers = self.shutdown_tx.receiver_count(),
                "Initiating graceful shutdown"
            );
        }
    }

    /// Whether shutdown has started
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Configured grace period
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout_duration
    }

    /// Start shutdown and wait for `task` to finish
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Timeout`] if the task overruns the grace
    /// period (the task is aborted), or [`ShutdownError::TaskFailed`] if it
    /// panicked.
    pub async fn shutdown_and_wait<T>(&self, mut task: JoinHandle<T>) -> Result<T, ShutdownError> {
        self.shutdown();

        match tokio::time::timeout(self.timeout_duration, &mut task).await {
            Ok(Ok(output)) => {
                info!("Shutdown complete");
                Ok(output)
            },
            Ok(Err(e)) => {
                error!(error = %e, "Task failed during shutdown");
                Err(ShutdownError::TaskFailed(e))
            },
            Err(_) => {
                error!(timeout = ?self.timeout_duration, "Shutdown timed out, aborting task");
                task.abort();
                Err(ShutdownError::Timeout(self.timeout_duration))
            },
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

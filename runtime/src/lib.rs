//! # OctoMuffin Runtime
//!
//! Runtime for the OctoMuffin bakery producer.
//!
//! This crate provides the emission loop that bakes a batch of muffins on a
//! fixed cadence and publishes its ingredient and lot events, plus the
//! coordination needed to stop it cleanly.
//!
//! ## Core Components
//!
//! - **Bakery**: The scheduler that owns the ticker, mints batch ids and publishes events
//! - **`ShutdownCoordinator`**: Owns the cancellation signal and bounds the shutdown grace period
//! - **`wait_for_signal`**: Waits for Ctrl+C or SIGTERM
//!
//! ## Example
//!
//! ```ignore
//! use octomuffin_runtime::{Bakery, ShutdownCoordinator};
//! use std::time::Duration;
//!
//! let bakery = Bakery::new(sink);
//! let coordinator = ShutdownCoordinator::new(Duration::from_secs(30));
//!
//! let signal = coordinator.subscribe();
//! let task = tokio::spawn(async move { bakery.bake(signal, Duration::from_secs(15)).await });
//!
//! octomuffin_runtime::wait_for_signal().await?;
//! coordinator.shutdown_and_wait(task).await??;
//! ```

/// The emission loop
pub mod bakery;

/// Graceful shutdown coordination
pub mod shutdown;

pub use bakery::{Bakery, BatchReport};
pub use error::{BakeError, ShutdownError};
pub use shutdown::{ShutdownCoordinator, wait_for_signal};

/// Error types for the runtime
pub mod error {
    use std::time::Duration;
    use thiserror::Error;

    /// Errors that prevent the emission loop from running.
    ///
    /// Delivery failures are never surfaced here: they are logged and the loop
    /// carries on.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum BakeError {
        /// The baking interval must be positive
        #[error("Baking interval must be greater than zero")]
        ZeroInterval,
    }

    /// Errors that can occur while shutting down
    #[derive(Error, Debug)]
    pub enum ShutdownError {
        /// The task did not finish within the grace period and was aborted
        #[error("Shutdown timed out after {0:?}")]
        Timeout(Duration),

        /// The task panicked or was cancelled
        #[error("Task failed during shutdown: {0}")]
        TaskFailed(#[from] tokio::task::JoinError),
    }
}

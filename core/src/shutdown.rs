//! Cancellation signal for long-running loops.
//!
//! A [`ShutdownSignal`] is the receiving half of a `watch` channel carrying a
//! single "shutting down" flag. Unlike a broadcast, a signal created after
//! cancellation still observes it, and dropping the sender counts as
//! cancellation so loops never outlive their owner.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle that resolves once shutdown has been requested.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    // Holds the sender of a signal that can never fire
    _anchor: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownSignal {
    /// Create a linked trigger/signal pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use octomuffin_core::shutdown::ShutdownSignal;
    ///
    /// let (trigger, signal) = ShutdownSignal::channel();
    /// assert!(!signal.is_shutdown());
    /// trigger.send_replace(true);
    /// assert!(signal.is_shutdown());
    /// ```
    #[must_use]
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::from_receiver(rx))
    }

    /// A signal that never fires, for one-off work outside a cancellable loop.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _anchor: Some(Arc::new(tx)),
        }
    }

    /// Wrap an existing receiver.
    #[must_use]
    pub const fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Self { rx, _anchor: None }
    }

    /// Whether shutdown has been requested (or the trigger dropped).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until shutdown is requested.
    ///
    /// Resolves immediately if shutdown was already requested or the trigger
    /// has been dropped.
    pub async fn cancelled(&mut self) {
        // wait_for errors only when the sender is gone
        let _ = self.rx.wait_for(|shutdown| *shutdown).await;
    }
}

//! Sink doubles for emission loop tests
//!
//! - [`RecordingSink`]: Records every event with its arrival time and answers
//!   with a fixed [`DeliveryResult`]
//! - [`BlockingSink`]: Holds each submission until the test releases it or
//!   shutdown fires

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use octomuffin_core::event::CloudEvent;
use octomuffin_core::event_sink::{DeliveryResult, EventSink, SinkError};
use octomuffin_core::shutdown::ShutdownSignal;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

/// An event as seen by a recording sink.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// When the submission reached the sink
    pub at: Instant,
    /// The submitted envelope
    pub event: CloudEvent,
}

#[derive(Debug)]
struct RecordingInner {
    recorded: Mutex<Vec<Recorded>>,
    response: DeliveryResult,
    notify: Notify,
}

/// Sink that records every submission.
///
/// Cloning shares the recording, so a test can keep one handle while the
/// emission loop owns another. Answers immediately, so the shutdown signal
/// never gets a chance to interrupt a submission.
///
/// # Example
///
/// ```
/// use octomuffin_testing::RecordingSink;
/// use octomuffin_core::event::CloudEvent;
/// use octomuffin_core::event_sink::EventSink;
/// use octomuffin_core::shutdown::ShutdownSignal;
///
/// # async fn example() {
/// let sink = RecordingSink::new();
/// let result = sink.send(&CloudEvent::new(), ShutdownSignal::never()).await;
///
/// assert!(result.is_ack());
/// assert_eq!(sink.len(), 1);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RecordingSink {
    inner: Arc<RecordingInner>,
}

impl RecordingSink {
    /// A sink that accepts every event with `202 Accepted`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_response(DeliveryResult::ack(202))
    }

    /// A sink that answers every event with `response`.
    #[must_use]
    pub fn with_response(response: DeliveryResult) -> Self {
        Self {
            inner: Arc::new(RecordingInner {
                recorded: Mutex::new(Vec::new()),
                response,
                notify: Notify::new(),
            }),
        }
    }

    /// A sink that leaves every event undelivered.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with_response(DeliveryResult::Undelivered(SinkError::Transport(
            "connection refused".to_string(),
        )))
    }

    /// A sink that refuses every event with `status`.
    #[must_use]
    pub fn nacking(status: u16) -> Self {
        Self::with_response(DeliveryResult::nack(status, "refused by test sink"))
    }

    /// Record `event` and wake anyone waiting for it.
    pub fn record(&self, event: &CloudEvent) {
        self.inner.recorded.lock().unwrap().push(Recorded {
            at: Instant::now(),
            event: event.clone(),
        });
        self.inner.notify.notify_waiters();
    }

    /// Everything recorded so far, in submission order.
    #[must_use]
    pub fn recorded(&self) -> Vec<Recorded> {
        self.inner.recorded.lock().unwrap().clone()
    }

    /// The recorded envelopes, in submission order.
    #[must_use]
    pub fn events(&self) -> Vec<CloudEvent> {
        self.inner
            .recorded
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.recorded.lock().unwrap().len()
    }

    /// Check if nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` events have been recorded.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.notify.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn send(
        &self,
        event: &CloudEvent,
        _shutdown: ShutdownSignal,
    ) -> Pin<Box<dyn Future<Output = DeliveryResult> + Send + '_>> {
        self.record(event);
        let response = self.inner.response.clone();
        Box::pin(async move { response })
    }
}

/// Sink whose submissions block until the test lets them through.
///
/// Each submission is counted as started on entry, then waits for a permit.
/// Completed submissions are recorded in [`BlockingSink::recording`].
///
/// Like a real client, a submission gives up as soon as shutdown fires and
/// reports [`SinkError::Cancelled`] without being recorded.
#[derive(Clone, Debug)]
pub struct BlockingSink {
    gate: Arc<Semaphore>,
    started: Arc<AtomicUsize>,
    recording: RecordingSink,
}

impl BlockingSink {
    /// Create a sink with the gate closed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
            recording: RecordingSink::new(),
        }
    }

    /// Let `count` more submissions through.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Open the gate for good.
    pub fn release_all(&self) {
        self.gate.close();
    }

    /// Number of submissions that have entered the sink.
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Submissions that made it through the gate.
    #[must_use]
    pub const fn recording(&self) -> &RecordingSink {
        &self.recording
    }

    /// Wait until at least `count` submissions have entered the sink.
    pub async fn wait_for_started(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.started() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for BlockingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BlockingSink {
    fn send(
        &self,
        event: &CloudEvent,
        mut shutdown: ShutdownSignal,
    ) -> Pin<Box<dyn Future<Output = DeliveryResult> + Send + '_>> {
        let event = event.clone();
        Box::pin(async move {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                biased;
                () = shutdown.cancelled() => DeliveryResult::Undelivered(SinkError::Cancelled),
                permit = self.gate.acquire() => {
                    // A closed gate lets everything through
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                    self.recording.record(&event);
                    self.recording.inner.response.clone()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_sink_answers_with_configured_response() {
        let sink = RecordingSink::rejecting();
        let result = sink.send(&CloudEvent::new(), ShutdownSignal::never()).await;
        assert!(result.is_undelivered());

        let sink = RecordingSink::nacking(503);
        let result = sink.send(&CloudEvent::new(), ShutdownSignal::never()).await;
        assert_eq!(result.status(), Some(503));
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_recording() {
        let sink = RecordingSink::new();
        let other = sink.clone();
        other.send(&CloudEvent::new(), ShutdownSignal::never()).await;
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn wait_for_sees_later_events() {
        let sink = RecordingSink::new();
        let writer = sink.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.send(&CloudEvent::new(), ShutdownSignal::never()).await;
        });

        assert!(sink.wait_for(1, Duration::from_secs(1)).await);
        assert!(!sink.wait_for(2, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn blocking_sink_holds_until_released() {
        let sink = BlockingSink::new();
        let sender = sink.clone();
        let task =
            tokio::spawn(async move { sender.send(&CloudEvent::new(), ShutdownSignal::never()).await });

        assert!(sink.wait_for_started(1, Duration::from_secs(1)).await);
        assert!(sink.recording().is_empty());

        sink.release(1);
        let result = task.await.unwrap();
        assert!(result.is_ack());
        assert_eq!(sink.recording().len(), 1);
    }

    #[tokio::test]
    async fn blocking_sink_gives_up_on_shutdown() {
        let sink = BlockingSink::new();
        let sender = sink.clone();
        let (trigger, signal) = ShutdownSignal::channel();
        let task = tokio::spawn(async move { sender.send(&CloudEvent::new(), signal).await });

        assert!(sink.wait_for_started(1, Duration::from_secs(1)).await);
        trigger.send_replace(true);

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_cancelled());
        assert!(sink.recording().is_empty());
    }
}

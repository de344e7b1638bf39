//! The emission loop.
//!
//! A [`Bakery`] bakes one batch per cycle. Every cycle:
//!
//! 1. mints a batch id,
//! 2. publishes one ingredient event per catalog ingredient, in order,
//! 3. publishes one lot event per coffee shop, in order,
//! 4. waits for the next tick or for shutdown.
//!
//! The first cycle runs immediately on entry; later cycles follow the ticker.
//! Cycles never overlap. A slow cycle pushes the next tick out, and ticks
//! missed meanwhile collapse into a single immediate cycle rather than a
//! burst of catch-up cycles.
//!
//! Delivery failures are logged and swallowed. The loop checks for shutdown
//! between cycles; inside a cycle every submission carries the shutdown
//! signal, so a cycle cut short by shutdown still walks every event but the
//! sink abandons each one as undelivered instead of waiting on it.

use crate::error::BakeError;
use octomuffin_core::bakery::{BakeryPayload, BatchIngredient, COFFEE_SHOPS, INGREDIENTS, Lot};
use octomuffin_core::environment::{Clock, SystemClock};
use octomuffin_core::event::new_event;
use octomuffin_core::event_sink::{DeliveryResult, EventSink};
use octomuffin_core::id::random_id;
use octomuffin_core::shutdown::ShutdownSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Summary of one production cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// The batch id shared by every event of the cycle
    pub batch: String,
    /// Events handed to the sink
    pub sent: usize,
    /// Events the sink accepted
    pub acked: usize,
    /// Events the sink received and refused
    pub nacked: usize,
    /// Events that never reached the sink
    pub undelivered: usize,
}

impl BatchReport {
    const fn new(batch: String) -> Self {
        Self {
            batch,
            sent: 0,
            acked: 0,
            nacked: 0,
            undelivered: 0,
        }
    }

    fn record(&mut self, result: &DeliveryResult) {
        self.sent += 1;
        match result {
            DeliveryResult::Ack { .. } => self.acked += 1,
            DeliveryResult::Nack { .. } => self.nacked += 1,
            DeliveryResult::Undelivered(_) => self.undelivered += 1,
        }
    }
}

/// Periodic producer of bakery CloudEvents.
///
/// # Example
///
/// ```ignore
/// let bakery = Bakery::new(Arc::new(HttpEventSink::new("http://localhost:8080")?));
/// let (trigger, signal) = ShutdownSignal::channel();
///
/// // Runs until `trigger` fires
/// bakery.bake(signal, Duration::from_secs(15)).await?;
/// ```
#[derive(Clone)]
pub struct Bakery {
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl Bakery {
    /// Create a bakery publishing to `sink`, stamping events with the system clock.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_clock(sink, Arc::new(SystemClock))
    }

    /// Create a bakery with an explicit clock.
    #[must_use]
    pub fn with_clock(sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    /// Bake batches until `shutdown` fires.
    ///
    /// `time_to_first_muffin` is the ticker period. The first batch is baked
    /// on entry; the second roughly one period later, and so on.
    ///
    /// Returns `Ok(())` once shutdown is observed between cycles.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ZeroInterval`] without baking anything if
    /// `time_to_first_muffin` is zero.
    pub async fn bake(
        &self,
        mut shutdown: ShutdownSignal,
        time_to_first_muffin: Duration,
    ) -> Result<(), BakeError> {
        if time_to_first_muffin.is_zero() {
            return Err(BakeError::ZeroInterval);
        }

        // The first tick lands one period after entry; the first batch does not wait for it.
        let mut ticker =
            tokio::time::interval_at(Instant::now() + time_to_first_muffin, time_to_first_muffin);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval = ?time_to_first_muffin, "Bakery open");

        loop {
            let report = self.bake_batch(&shutdown).await;
            tracing::info!(
                batch = %report.batch,
                sent = report.sent,
                acked = report.acked,
                nacked = report.nacked,
                undelivered = report.undelivered,
                "Batch baked"
            );

            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!("Bakery closed");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }
        }
    }

    /// Bake a single batch: publish its ingredient events, then its lot events.
    ///
    /// Every submission runs under `shutdown`; once it fires the remaining
    /// events of the batch come back undelivered without reaching the sink.
    #[tracing::instrument(skip(self, shutdown), name = "bake_batch")]
    pub async fn bake_batch(&self, shutdown: &ShutdownSignal) -> BatchReport {
        let batch = random_id();
        let mut report = BatchReport::new(batch.clone());

        for ingredient in &INGREDIENTS {
            let payload = BatchIngredient::draw(ingredient, &batch, random_id());
            self.deliver(payload.into(), shutdown, &mut report).await;
        }

        for shop in COFFEE_SHOPS {
            let payload = Lot::sent_to(shop, &batch, random_id());
            self.deliver(payload.into(), shutdown, &mut report).await;
        }

        report
    }

    async fn deliver(
        &self,
        payload: BakeryPayload,
        shutdown: &ShutdownSignal,
        report: &mut BatchReport,
    ) {
        let event = new_event(payload.event_type(), payload.batch(), &payload, self.clock.as_ref());
        let result = self.sink.send(&event, shutdown.clone()).await;
        report.record(&result);

        match &result {
            DeliveryResult::Ack { status } => {
                tracing::debug!(
                    id = %event.id(),
                    event_type = %event.event_type(),
                    status = ?status,
                    "Event delivered"
                );
            },
            DeliveryResult::Nack { status, reason } => {
                tracing::debug!(
                    id = %event.id(),
                    event_type = %event.event_type(),
                    status = ?status,
                    reason = %reason,
                    "Event refused by sink"
                );
            },
            DeliveryResult::Undelivered(error) => {
                tracing::error!(
                    id = %event.id(),
                    event_type = %event.event_type(),
                    error = %error,
                    "failed to send cloudevent"
                );
            },
        }
    }
}

impl std::fmt::Debug for Bakery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bakery").finish_non_exhaustive()
    }
}

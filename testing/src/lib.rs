//! # OctoMuffin Testing
//!
//! Testing utilities and helpers for the OctoMuffin bakery producer.
//!
//! This crate provides:
//! - A deterministic [`Clock`] implementation
//! - Sink doubles that record what the emission loop publishes
//! - Assertion helpers for batches of bakery events
//!
//! ## Example
//!
//! ```ignore
//! use octomuffin_testing::{RecordingSink, helpers::assert_well_formed_batch};
//! use octomuffin_runtime::Bakery;
//!
//! #[tokio::test]
//! async fn bakes_one_batch() {
//!     let sink = RecordingSink::new();
//!     let bakery = Bakery::new(Arc::new(sink.clone()));
//!
//!     bakery.bake_batch(&ShutdownSignal::never()).await;
//!
//!     assert_well_formed_batch(&sink.events());
//! }
//! ```

use chrono::{DateTime, Utc};
use octomuffin_core::environment::Clock;

/// Sink doubles
pub mod sink_mocks;

pub use sink_mocks::{BlockingSink, Recorded, RecordingSink};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making envelopes reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use octomuffin_testing::mocks::FixedClock;
    /// use octomuffin_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Assertion helpers for published bakery events.
pub mod helpers {
    #![allow(clippy::missing_panics_doc, clippy::panic)] // Assertions panic by design

    use octomuffin_core::bakery::{BatchIngredient, COFFEE_SHOPS, EVENTS_PER_BATCH, INGREDIENTS, Lot};
    use octomuffin_core::event::{CloudEvent, INGREDIENT_EVENT_TYPE, LOT_EVENT_TYPE, SOURCE};

    /// Split a stream of events into consecutive runs sharing a subject.
    #[must_use]
    pub fn split_batches(events: &[CloudEvent]) -> Vec<Vec<CloudEvent>> {
        let mut batches: Vec<Vec<CloudEvent>> = Vec::new();
        for event in events {
            match batches.last_mut() {
                Some(batch) if batch[0].subject() == event.subject() => batch.push(event.clone()),
                _ => batches.push(vec![event.clone()]),
            }
        }
        batches
    }

    /// Assert that `events` is exactly one complete, correctly correlated batch:
    /// seven ingredient events then three lot events, in catalog order, all
    /// sharing one subject that matches every payload's `Batch`.
    pub fn assert_well_formed_batch(events: &[CloudEvent]) {
        assert_eq!(events.len(), EVENTS_PER_BATCH, "a batch has {EVENTS_PER_BATCH} events");

        let batch = events[0].subject().unwrap_or_default().to_string();
        assert!(!batch.is_empty(), "batch events carry a subject");

        for event in events {
            assert_eq!(event.source(), SOURCE);
            assert_eq!(event.subject(), Some(batch.as_str()));
        }

        let (ingredients, lots) = events.split_at(INGREDIENTS.len());

        for (event, expected) in ingredients.iter().zip(INGREDIENTS.iter()) {
            assert_eq!(event.event_type(), INGREDIENT_EVENT_TYPE);
            let payload: BatchIngredient = decode(event);
            assert_eq!(payload.amount, expected.amount);
            assert_eq!(payload.name, expected.name);
            assert_eq!(payload.batch, batch);
        }

        for (event, shop) in lots.iter().zip(COFFEE_SHOPS) {
            assert_eq!(event.event_type(), LOT_EVENT_TYPE);
            let payload: Lot = decode(event);
            assert_eq!(payload.name, format!("Sent to {shop}"));
            assert_eq!(payload.batch, batch);
        }
    }

    /// Decode an event's data, failing the test if it is missing or malformed.
    #[must_use]
    pub fn decode<T: serde::de::DeserializeOwned>(event: &CloudEvent) -> T {
        match event.data_as::<T>() {
            Ok(Some(payload)) => payload,
            Ok(None) => panic!("event {} has no data", event.id()),
            Err(e) => panic!("event {} has malformed data: {e}", event.id()),
        }
    }

    /// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

//! # OctoMuffin Core
//!
//! Core types for the OctoMuffin bakery producer.
//!
//! OctoMuffin simulates a muffin-bakery supply chain: every production cycle
//! mints a batch identifier and publishes CloudEvents describing the
//! ingredients drawn from inventory and the lots dispatched to coffee shops.
//!
//! ## Core Concepts
//!
//! - **CloudEvent**: The envelope published to the sink ([`event::CloudEvent`])
//! - **Event factory**: Builds envelopes with fixed source and subject conventions ([`event::new_event`])
//! - **Identifiers**: Short random tokens for batches, inventory draws and lots ([`id::random_id`])
//! - **Catalogs**: The static ingredient and coffee-shop tables ([`bakery`])
//! - **Sink**: The delivery capability the emission loop publishes through ([`event_sink::EventSink`])
//! - **Shutdown**: The cancellation signal that stops the loop ([`shutdown::ShutdownSignal`])
//!
//! ## Example
//!
//! ```
//! use octomuffin_core::bakery::{BatchIngredient, INGREDIENTS};
//! use octomuffin_core::environment::SystemClock;
//! use octomuffin_core::event::{new_event, INGREDIENT_EVENT_TYPE};
//! use octomuffin_core::id::random_id;
//!
//! let batch = random_id();
//! let payload = BatchIngredient::draw(&INGREDIENTS[0], &batch, random_id());
//! let event = new_event(INGREDIENT_EVENT_TYPE, &batch, &payload, &SystemClock);
//!
//! assert_eq!(event.subject(), Some(batch.as_str()));
//! assert_eq!(event.event_type(), INGREDIENT_EVENT_TYPE);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Bakery catalogs and event payloads
pub mod bakery;

/// CloudEvent envelope and the event factory
pub mod event;

/// Sink capability and delivery classification
pub mod event_sink;

/// Random identifier minting
pub mod id;

/// Cancellation signal for long-running loops
pub mod shutdown;

/// Environment module - Dependency injection traits
///
/// External dependencies of the producer are abstracted behind traits so that
/// tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// The event factory stamps every envelope with `time` taken from a clock.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic envelopes
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

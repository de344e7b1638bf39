//! Sink abstraction for publishing CloudEvents.
//!
//! The emission loop treats its sink as opaque: it hands over one envelope at a
//! time and receives a [`DeliveryResult`] it can classify. Transport details
//! (HTTP status codes, content modes, timeouts) stay inside the implementation.
//!
//! # Delivery Classification
//!
//! | Outcome | Meaning | Undelivered? |
//! |---|---|---|
//! | [`DeliveryResult::Ack`] | the sink accepted the event | no |
//! | [`DeliveryResult::Nack`] | the sink responded but refused the event | no |
//! | [`DeliveryResult::Undelivered`] | no usable response (connect failure, timeout, encoding, cancellation) | yes |
//!
//! A NACK still proves the event reached the sink, so only transport failures
//! count as undelivered.
//!
//! # Cancellation
//!
//! Every submission runs under a [`ShutdownSignal`]. Once it fires, an
//! in-flight submission is abandoned and later ones fail straight away with
//! [`SinkError::Cancelled`], so a cancelled cycle drains without waiting on
//! the network.
//!
//! # Implementations
//!
//! - `HttpEventSink` (`octomuffin-http`) - CloudEvents HTTP protocol binding
//! - `RecordingSink`, `BlockingSink` (`octomuffin-testing`) - test doubles

use crate::event::CloudEvent;
use crate::shutdown::ShutdownSignal;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Transport-level failures that leave an event undelivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Could not reach the sink or the connection broke mid-request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The sink did not respond in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The envelope could not be encoded for the wire.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Shutdown fired before the sink answered.
    #[error("Submission cancelled by shutdown")]
    Cancelled,

    /// The configured target is not a usable URL.
    #[error("Invalid sink target '{target}': {reason}")]
    InvalidTarget {
        /// The rejected target
        target: String,
        /// Why it was rejected
        reason: String,
    },

    /// Generic error for other failures
    #[error("Sink error: {0}")]
    Other(String),
}

/// Outcome of submitting one event to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The sink accepted the event.
    Ack {
        /// Protocol status code, if the transport has one
        status: Option<u16>,
    },

    /// The sink received the event and refused it.
    Nack {
        /// Protocol status code, if the transport has one
        status: Option<u16>,
        /// Response detail from the sink
        reason: String,
    },

    /// The event did not reach the sink.
    Undelivered(SinkError),
}

impl DeliveryResult {
    /// Acknowledged with the given status code.
    #[must_use]
    pub const fn ack(status: u16) -> Self {
        Self::Ack {
            status: Some(status),
        }
    }

    /// Refused with the given status code.
    #[must_use]
    pub fn nack(status: u16, reason: impl Into<String>) -> Self {
        Self::Nack {
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Whether the sink accepted the event.
    #[must_use]
    pub const fn is_ack(&self) -> bool {
        matches!(self, Self::Ack { .. })
    }

    /// Whether the sink received and refused the event.
    #[must_use]
    pub const fn is_nack(&self) -> bool {
        matches!(self, Self::Nack { .. })
    }

    /// Whether the event never reached the sink.
    #[must_use]
    pub const fn is_undelivered(&self) -> bool {
        matches!(self, Self::Undelivered(_))
    }

    /// Whether the submission was abandoned because of shutdown.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Undelivered(SinkError::Cancelled))
    }

    /// The transport error behind an undelivered result.
    #[must_use]
    pub const fn error(&self) -> Option<&SinkError> {
        match self {
            Self::Undelivered(error) => Some(error),
            Self::Ack { .. } | Self::Nack { .. } => None,
        }
    }

    /// Protocol status code, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Ack { status } | Self::Nack { status, .. } => *status,
            Self::Undelivered(_) => None,
        }
    }
}

impl From<SinkError> for DeliveryResult {
    fn from(error: SinkError) -> Self {
        Self::Undelivered(error)
    }
}

impl fmt::Display for DeliveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack { status: Some(status) } => write!(f, "ACK ({status})"),
            Self::Ack { status: None } => write!(f, "ACK"),
            Self::Nack {
                status: Some(status),
                reason,
            } => write!(f, "NACK ({status}): {reason}"),
            Self::Nack { status: None, reason } => write!(f, "NACK: {reason}"),
            Self::Undelivered(error) => write!(f, "undelivered: {error}"),
        }
    }
}

/// Trait for CloudEvent sinks.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the emission loop holds its sink as
/// `Arc<dyn EventSink>`.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be used as a trait object.
///
/// # Examples
///
/// ```rust,ignore
/// let result = sink.send(&event, shutdown.clone()).await;
/// if result.is_undelivered() {
///     tracing::error!(error = %result, "failed to send cloudevent");
/// }
/// ```
pub trait EventSink: Send + Sync {
    /// Submit one event under `shutdown` and report how the sink handled it.
    ///
    /// Never fails outright: transport failures are reported as
    /// [`DeliveryResult::Undelivered`]. Implementations stop waiting on the
    /// sink once `shutdown` fires and report [`SinkError::Cancelled`].
    fn send(
        &self,
        event: &CloudEvent,
        shutdown: ShutdownSignal,
    ) -> Pin<Box<dyn Future<Output = DeliveryResult> + Send + '_>>;
}

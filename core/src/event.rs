//! CloudEvent envelope and the bakery event factory.
//!
//! This module defines the envelope published to the sink and the factory
//! that applies the producer's conventions to it.
//!
//! # Envelope Conventions
//!
//! Every envelope produced by [`new_event`] carries:
//!
//! - `specversion`: `1.0`
//! - `id`: a fresh UUID v4, unique per envelope
//! - `type`: [`INGREDIENT_EVENT_TYPE`] or [`LOT_EVENT_TYPE`]
//! - `source`: [`SOURCE`]
//! - `subject`: the batch identifier of the current production cycle
//! - `datacontenttype`: `application/json`
//! - `time`: the clock's current time
//!
//! # Example
//!
//! ```
//! use octomuffin_core::bakery::Lot;
//! use octomuffin_core::environment::SystemClock;
//! use octomuffin_core::event::{new_event, LOT_EVENT_TYPE, SOURCE};
//!
//! let lot = Lot::sent_to("Tougo Coffee", "QUJDREVG", "R0hJSktM".to_string());
//! let event = new_event(LOT_EVENT_TYPE, "QUJDREVG", &lot, &SystemClock);
//!
//! assert_eq!(event.source(), SOURCE);
//! assert_eq!(event.subject(), Some("QUJDREVG"));
//! let decoded: Lot = event.data_as().unwrap().unwrap();
//! assert_eq!(decoded, lot);
//! ```

use crate::environment::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

/// CloudEvents specification version stamped on every envelope.
pub const SPEC_VERSION: &str = "1.0";

/// Source attribute identifying this producer.
pub const SOURCE: &str = "github.com/n3wscott/octomuffin";

/// Event type for ingredients drawn from inventory.
pub const INGREDIENT_EVENT_TYPE: &str = "com.n3wscott.atlanta.octomuffin.ingredient";

/// Event type for lots dispatched to a coffee shop.
pub const LOT_EVENT_TYPE: &str = "com.n3wscott.atlanta.octomuffin.lot";

/// Media type of JSON encoded data.
pub const APPLICATION_JSON: &str = "application/json";

/// Error types for envelope operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to encode the payload as event data.
    #[error("Failed to encode event data: {0}")]
    EncodingError(String),

    /// Failed to decode event data into the requested type.
    #[error("Failed to decode event data: {0}")]
    DecodingError(String),

    /// The data content type is not one this producer can encode.
    #[error("Unsupported data content type: {0}")]
    UnsupportedContentType(String),
}

/// A CloudEvents v1.0 envelope with JSON data.
///
/// Serializing a `CloudEvent` with serde yields the CloudEvents JSON event
/// format, which is also the body of a structured-mode HTTP request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    id: String,
    source: String,
    specversion: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datacontenttype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CloudEvent {
    /// Create an empty envelope with a fresh id and the default spec version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: String::new(),
            specversion: SPEC_VERSION.to_string(),
            event_type: String::new(),
            subject: None,
            datacontenttype: None,
            time: None,
            data: None,
        }
    }

    /// The event id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `source` attribute.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `specversion` attribute.
    #[must_use]
    pub fn spec_version(&self) -> &str {
        &self.specversion
    }

    /// The `type` attribute.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The `subject` attribute, if set.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The `datacontenttype` attribute, if set.
    #[must_use]
    pub fn data_content_type(&self) -> Option<&str> {
        self.datacontenttype.as_deref()
    }

    /// The `time` attribute, if set.
    #[must_use]
    pub const fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// The event data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Set the event id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Set the `source` attribute.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Set the `type` attribute.
    pub fn set_type(&mut self, event_type: impl Into<String>) {
        self.event_type = event_type.into();
    }

    /// Set the `subject` attribute.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Set the `time` attribute.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    /// Encode `data` under `content_type`.
    ///
    /// The content type is recorded even when encoding fails, in which case the
    /// envelope is left without data.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnsupportedContentType`] for non-JSON media types
    /// and [`EventError::EncodingError`] if `data` cannot be represented as JSON.
    pub fn set_data<T: Serialize + ?Sized>(
        &mut self,
        content_type: &str,
        data: &T,
    ) -> Result<(), EventError> {
        self.datacontenttype = Some(content_type.to_string());
        self.data = None;

        if !is_json_media_type(content_type) {
            return Err(EventError::UnsupportedContentType(content_type.to_string()));
        }

        let value =
            serde_json::to_value(data).map_err(|e| EventError::EncodingError(e.to_string()))?;
        self.data = Some(value);
        Ok(())
    }

    /// Encoded data bytes, as sent in a binary-mode HTTP body.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EncodingError`] if the data cannot be serialized.
    pub fn data_bytes(&self) -> Result<Option<Vec<u8>>, EventError> {
        self.data
            .as_ref()
            .map(|value| serde_json::to_vec(value).map_err(|e| EventError::EncodingError(e.to_string())))
            .transpose()
    }

    /// Decode the event data into `T`.
    ///
    /// Returns `Ok(None)` when the envelope has no data.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DecodingError`] if the data does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, EventError> {
        self.data
            .as_ref()
            .map(|value| {
                T::deserialize(value).map_err(|e| EventError::DecodingError(e.to_string()))
            })
            .transpose()
    }
}

impl Default for CloudEvent {
    fn default() -> Self {
        Self::new()
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == APPLICATION_JSON || essence.ends_with("+json")
}

/// Build a bakery envelope for `batch` carrying `data` as JSON.
///
/// Encoding failures are logged and swallowed: the envelope is returned with
/// its attributes set and no data.
pub fn new_event<T: Serialize + ?Sized>(
    event_type: &str,
    batch: &str,
    data: &T,
    clock: &dyn Clock,
) -> CloudEvent {
    let mut event = CloudEvent::new();
    event.set_type(event_type);
    event.set_source(SOURCE);
    event.set_subject(batch);
    event.set_time(clock.now());
    if let Err(e) = event.set_data(APPLICATION_JSON, data) {
        tracing::error!(
            event_type = %event_type,
            batch = %batch,
            error = %e,
            "failed to encode cloudevent data"
        );
    }
    event
}

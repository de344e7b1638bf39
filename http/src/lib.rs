//! CloudEvents HTTP sink for OctoMuffin.
//!
//! This crate provides [`HttpEventSink`], an [`EventSink`] that delivers each
//! envelope to an HTTP endpoint using the CloudEvents HTTP protocol binding.
//!
//! # Content Modes
//!
//! - **Binary** (default): context attributes travel as `ce-*` headers, the
//!   body is the event data and `Content-Type` is the data content type
//! - **Structured**: the whole envelope is the body, encoded in the
//!   CloudEvents JSON format with `Content-Type: application/cloudevents+json`
//!
//! # Delivery Semantics
//!
//! One request per event, no retries:
//! - `2xx` responses are ACKs
//! - Any other response is a NACK: the event reached the sink and was refused
//! - Connection failures, timeouts and encoding failures leave the event undelivered
//! - Shutdown abandons the request in flight; the event is undelivered with
//!   [`SinkError::Cancelled`]
//!
//! # Example
//!
//! ```no_run
//! use octomuffin_http::{ContentMode, HttpEventSink};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Basic configuration
//! let sink = HttpEventSink::new("http://broker-ingress.default.svc.cluster.local")?;
//!
//! // Custom configuration
//! let sink = HttpEventSink::builder()
//!     .target("http://localhost:8080")
//!     .mode(ContentMode::Structured)
//!     .timeout(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use octomuffin_core::event::CloudEvent;
use octomuffin_core::event_sink::{DeliveryResult, EventSink, SinkError};
use octomuffin_core::shutdown::ShutdownSignal;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Media type of a structured-mode request body.
pub const CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body kept as a NACK reason.
const MAX_REASON_LEN: usize = 512;

/// How events are mapped onto HTTP requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Attributes in `ce-*` headers, data in the body
    #[default]
    Binary,
    /// The JSON-encoded envelope in the body
    Structured,
}

/// Error returned when parsing an unknown content mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown content mode '{0}' (expected 'binary' or 'structured')")]
pub struct ParseContentModeError(String);

impl FromStr for ContentMode {
    type Err = ParseContentModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "structured" => Ok(Self::Structured),
            _ => Err(ParseContentModeError(s.to_string())),
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

/// HTTP sink speaking the CloudEvents HTTP protocol binding.
///
/// Cheap to clone: clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpEventSink {
    /// HTTP client with the request timeout applied
    client: Client,
    /// Where every event is POSTed
    target: Url,
    /// Binary or structured content mode
    mode: ContentMode,
    /// Per-request timeout
    timeout: Duration,
}

impl HttpEventSink {
    /// Create a sink with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidTarget`] if `target` is not an `http` or
    /// `https` URL, or [`SinkError::Other`] if the HTTP client cannot be built.
    pub fn new(target: &str) -> Result<Self, SinkError> {
        Self::builder().target(target).build()
    }

    /// Create a new builder for configuring the sink.
    #[must_use]
    pub fn builder() -> HttpEventSinkBuilder {
        HttpEventSinkBuilder::default()
    }

    /// The target URL.
    #[must_use]
    pub const fn target(&self) -> &Url {
        &self.target
    }

    /// The content mode.
    #[must_use]
    pub const fn mode(&self) -> ContentMode {
        self.mode
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, event: &CloudEvent) -> Result<RequestBuilder, SinkError> {
        let request = self.client.post(self.target.clone());

        match self.mode {
            ContentMode::Binary => {
                let mut request = request
                    .header("ce-specversion", encode_header_value(event.spec_version()))
                    .header("ce-id", encode_header_value(event.id()))
                    .header("ce-source", encode_header_value(event.source()))
                    .header("ce-type", encode_header_value(event.event_type()));
                if let Some(subject) = event.subject() {
                    request = request.header("ce-subject", encode_header_value(subject));
                }
                if let Some(time) = event.time() {
                    request = request.header("ce-time", time.to_rfc3339());
                }
                if let Some(content_type) = event.data_content_type() {
                    request = request.header(CONTENT_TYPE, content_type);
                }
                let body = event
                    .data_bytes()
                    .map_err(|e| SinkError::Encoding(e.to_string()))?
                    .unwrap_or_default();
                Ok(request.body(body))
            },
            ContentMode::Structured => {
                let body =
                    serde_json::to_vec(event).map_err(|e| SinkError::Encoding(e.to_string()))?;
                Ok(request.header(CONTENT_TYPE, CLOUDEVENTS_JSON).body(body))
            },
        }
    }
}

/// Builder for configuring an [`HttpEventSink`].
///
/// # Example
///
/// ```no_run
/// use octomuffin_http::{ContentMode, HttpEventSink};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = HttpEventSink::builder()
///     .target("http://localhost:8080/events")
///     .mode(ContentMode::Binary)
///     .timeout(Duration::from_secs(10))
///     .user_agent("octomuffin/0.1")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct HttpEventSinkBuilder {
    target: Option<String>,
    mode: Option<ContentMode>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpEventSinkBuilder {
    /// Set the target URL.
    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the content mode.
    ///
    /// Default: [`ContentMode::Binary`]
    #[must_use]
    pub const fn mode(mut self, mode: ContentMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the per-request timeout.
    ///
    /// Default: 30 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the [`HttpEventSink`].
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidTarget`] if:
    /// - Target not set
    /// - Target is not a valid URL
    /// - Target scheme is not `http` or `https`
    ///
    /// Returns [`SinkError::Other`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<HttpEventSink, SinkError> {
        let raw = self.target.ok_or_else(|| SinkError::InvalidTarget {
            target: String::new(),
            reason: "Target not configured".to_string(),
        })?;

        let target = Url::parse(&raw).map_err(|e| SinkError::InvalidTarget {
            target: raw.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(target.scheme(), "http" | "https") {
            return Err(SinkError::InvalidTarget {
                target: raw,
                reason: format!("unsupported scheme '{}'", target.scheme()),
            });
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mode = self.mode.unwrap_or_default();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| concat!("octomuffin/", env!("CARGO_PKG_VERSION")).to_string());

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SinkError::Other(format!("Failed to create HTTP client: {e}")))?;

        tracing::info!(
            sink = %target,
            mode = %mode,
            timeout = ?timeout,
            "HttpEventSink created successfully"
        );

        Ok(HttpEventSink {
            client,
            target,
            mode,
            timeout,
        })
    }
}

impl EventSink for HttpEventSink {
    fn send(
        &self,
        event: &CloudEvent,
        mut shutdown: ShutdownSignal,
    ) -> Pin<Box<dyn Future<Output = DeliveryResult> + Send + '_>> {
        // Build the request before moving into the async block
        let request = self.request(event);
        let id = event.id().to_string();

        Box::pin(async move {
            if shutdown.is_shutdown() {
                return DeliveryResult::Undelivered(SinkError::Cancelled);
            }

            let request = match request {
                Ok(request) => request,
                Err(e) => return DeliveryResult::Undelivered(e),
            };

            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::debug!(id = %id, "Submission abandoned on shutdown");
                    DeliveryResult::Undelivered(SinkError::Cancelled)
                }
                result = submit(request, &id) => result,
            }
        })
    }
}

async fn submit(request: RequestBuilder, id: &str) -> DeliveryResult {
    match request.send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                tracing::trace!(id = %id, status = status.as_u16(), "Sink accepted event");
                DeliveryResult::ack(status.as_u16())
            } else {
                let mut reason = response.text().await.unwrap_or_default();
                truncate(&mut reason, MAX_REASON_LEN);
                if reason.is_empty() {
                    reason = status.canonical_reason().unwrap_or_default().to_string();
                }
                tracing::trace!(id = %id, status = status.as_u16(), "Sink refused event");
                DeliveryResult::nack(status.as_u16(), reason)
            }
        },
        Err(e) => DeliveryResult::Undelivered(classify_error(&e)),
    }
}

fn classify_error(error: &reqwest::Error) -> SinkError {
    if error.is_timeout() {
        SinkError::Timeout(error.to_string())
    } else if error.is_builder() || error.is_body() {
        SinkError::Encoding(error.to_string())
    } else {
        SinkError::Transport(error.to_string())
    }
}

fn truncate(text: &mut String, max: usize) {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
}

/// Percent-encode a context attribute for use as a `ce-*` header value.
///
/// Space, `"`, `%` and anything outside printable ASCII are encoded as UTF-8
/// octets; everything else passes through unchanged.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_graphic() && byte != b'"' && byte != b'%' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

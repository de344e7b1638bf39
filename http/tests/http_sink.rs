//! Integration tests for the CloudEvents HTTP sink against a mock endpoint

#![allow(clippy::unwrap_used, clippy::expect_used)] // Tests can unwrap

use octomuffin_core::bakery::{COFFEE_SHOPS, Lot};
use octomuffin_core::event::{LOT_EVENT_TYPE, SOURCE, new_event};
use octomuffin_core::event_sink::{EventSink, SinkError};
use octomuffin_core::shutdown::ShutdownSignal;
use octomuffin_http::{CLOUDEVENTS_JSON, ContentMode, HttpEventSink};
use octomuffin_testing::test_clock;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lot_event() -> octomuffin_core::event::CloudEvent {
    let lot = Lot::sent_to(COFFEE_SHOPS[0], "QUJDREVG", "R0hJSktM".to_string());
    new_event(LOT_EVENT_TYPE, "QUJDREVG", &lot, &test_clock())
}

#[tokio::test]
async fn binary_mode_sends_attributes_as_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("ce-specversion", "1.0"))
        .and(header("ce-type", LOT_EVENT_TYPE))
        .and(header("ce-source", SOURCE))
        .and(header("ce-subject", "QUJDREVG"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let sink = HttpEventSink::new(&server.uri()).unwrap();
    let event = lot_event();
    let result = sink.send(&event, ShutdownSignal::never()).await;

    assert!(result.is_ack(), "unexpected result: {result}");
    assert_eq!(result.status(), Some(202));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.headers.get("ce-id").unwrap().to_str().unwrap(),
        event.id()
    );
    assert_eq!(
        request.headers.get("ce-time").unwrap().to_str().unwrap(),
        "2025-01-01T00:00:00+00:00"
    );

    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(
        body,
        json!({
            "Name": "Sent to Tougo Coffee",
            "Batch": "QUJDREVG",
            "Lot": "R0hJSktM",
        })
    );
}

#[tokio::test]
async fn structured_mode_sends_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", CLOUDEVENTS_JSON))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sink = HttpEventSink::builder()
        .target(server.uri())
        .mode(ContentMode::Structured)
        .build()
        .unwrap();
    let event = lot_event();
    let result = sink.send(&event, ShutdownSignal::never()).await;
    assert!(result.is_ack());

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["specversion"], "1.0");
    assert_eq!(body["id"], event.id());
    assert_eq!(body["type"], LOT_EVENT_TYPE);
    assert_eq!(body["source"], SOURCE);
    assert_eq!(body["subject"], "QUJDREVG");
    assert_eq!(body["datacontenttype"], "application/json");
    assert_eq!(body["data"]["Name"], "Sent to Tougo Coffee");
    assert!(requests[0].headers.get("ce-type").is_none());
}

#[tokio::test]
async fn error_status_is_a_nack_not_undelivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("oven is cold"))
        .mount(&server)
        .await;

    let sink = HttpEventSink::new(&server.uri()).unwrap();
    let result = sink.send(&lot_event(), ShutdownSignal::never()).await;

    assert!(result.is_nack());
    assert!(!result.is_undelivered());
    assert_eq!(result.status(), Some(503));
    assert_eq!(result.to_string(), "NACK (503): oven is cold");
}

#[tokio::test]
async fn empty_error_body_falls_back_to_reason_phrase() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = HttpEventSink::new(&server.uri()).unwrap();
    let result = sink.send(&lot_event(), ShutdownSignal::never()).await;

    assert_eq!(result.to_string(), "NACK (404): Not Found");
}

#[tokio::test]
async fn slow_sink_times_out_as_undelivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let sink = HttpEventSink::builder()
        .target(server.uri())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let result = sink.send(&lot_event(), ShutdownSignal::never()).await;

    assert!(result.is_undelivered());
    assert!(matches!(result.error(), Some(SinkError::Timeout(_))));
}

#[tokio::test]
async fn unreachable_sink_is_undelivered() {
    // Bind then drop a listener so the port is known to be closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let sink = HttpEventSink::builder()
        .target(format!("http://127.0.0.1:{port}"))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let result = sink.send(&lot_event(), ShutdownSignal::never()).await;

    assert!(result.is_undelivered());
    assert!(result.error().is_some());
}

#[tokio::test]
async fn shutdown_abandons_request_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let sink = HttpEventSink::new(&server.uri()).unwrap();
    let (trigger, signal) = ShutdownSignal::channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.send_replace(true);
    });

    let started = Instant::now();
    let result = sink.send(&lot_event(), signal).await;

    assert!(result.is_cancelled(), "unexpected result: {result}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn nothing_is_sent_after_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let sink = HttpEventSink::new(&server.uri()).unwrap();
    let (trigger, signal) = ShutdownSignal::channel();
    trigger.send_replace(true);

    let result = sink.send(&lot_event(), signal).await;

    assert!(result.is_cancelled());
    assert!(server.received_requests().await.unwrap().is_empty());
}

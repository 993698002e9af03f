// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::context::SessionAuth;
use fieldsync_core::{BatteryStatus, Position, TelemetryRecord};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use yare::parameterized;

#[parameterized(
    timeout = { 408, true },
    throttled = { 429, true },
    server = { 500, true },
    gateway = { 503, true },
    bad_request = { 400, false },
    forbidden = { 403, false },
    not_found = { 404, false },
    unprocessable = { 422, false },
)]
fn status_classification(status: u16, retryable: bool) {
    assert_eq!(classify_status(status, String::new()).is_retryable(), retryable);
}

#[test]
fn unauthenticated_is_retryable() {
    assert!(DeliveryError::Unauthenticated.is_retryable());
}

#[test]
fn base_url_trailing_slash_trimmed() {
    let backend = HttpBackend::new("https://api.example.com/", Arc::new(SessionAuth::new()));
    assert_eq!(
        backend.url("/api/mobile/location"),
        "https://api.example.com/api/mobile/location"
    );
}

#[tokio::test]
async fn calls_without_token_fail_before_network() {
    let backend = HttpBackend::new("http://127.0.0.1:9", Arc::new(SessionAuth::new()));
    assert_eq!(
        backend.mark_offline().await.unwrap_err(),
        DeliveryError::Unauthenticated
    );
    assert_eq!(
        backend.fetch_campaigns().await.unwrap_err(),
        DeliveryError::Unauthenticated
    );
}

// ---------------------------------------------------------------------------
// Against a local HTTP responder
// ---------------------------------------------------------------------------

/// Request line, headers, and body as received.
struct Captured {
    head: String,
    body: String,
}

impl Captured {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Answers one request with `status` and `reply`.
async fn respond_once(status: u16, reply: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let split = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break i;
            }
        };
        let head = String::from_utf8_lossy(&buf[..split]).to_string();
        let captured = Captured {
            head,
            body: String::new(),
        };
        let length = captured
            .header("content-length")
            .map(|v| v.parse::<usize>().unwrap())
            .unwrap_or(0);
        let start = split + 4;
        while buf.len() < start + length {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[start..start + length]).to_string();

        let response = format!(
            "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        Captured { body, ..captured }
    });
    (url, handle)
}

fn backend(url: &str) -> HttpBackend {
    HttpBackend::new(url, Arc::new(SessionAuth::signed_in("tok-1", "42")))
}

fn payload() -> TelemetryPayload {
    let position = Position::new(-23.5, -46.6, chrono::Utc::now()).with_accuracy(8.0);
    TelemetryRecord::new(
        Some(position),
        BatteryStatus::from_fraction(0.42, true),
        true,
        false,
        chrono::Utc::now(),
    )
    .to_payload(true)
}

#[tokio::test]
async fn deliver_posts_payload_with_bearer_token() {
    let (url, server) = respond_once(200, "{}").await;
    backend(&url).deliver(&payload()).await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "POST /api/mobile/location HTTP/1.1");
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer tok-1"));
    let body = request.json();
    assert_eq!(body["latitude"], json!(-23.5));
    assert_eq!(body["batteryLevel"], json!(42));
    assert_eq!(body["isCharging"], json!(true));
    assert_eq!(body["wasQueued"], json!(true));
}

#[tokio::test]
async fn server_error_is_transient() {
    let (url, server) = respond_once(503, "busy").await;
    let err = backend(&url).deliver(&payload()).await.unwrap_err();
    server.await.unwrap();
    assert!(matches!(err, DeliveryError::Transient(_)));
}

#[tokio::test]
async fn validation_error_is_permanent_with_body() {
    let (url, server) = respond_once(422, "{\"error\":\"bad latitude\"}").await;
    let err = backend(&url).deliver(&payload()).await.unwrap_err();
    server.await.unwrap();
    assert_eq!(
        err,
        DeliveryError::Permanent {
            status: 422,
            body: "{\"error\":\"bad latitude\"}".into()
        }
    );
}

#[tokio::test]
async fn refused_connection_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = backend(&url).deliver(&payload()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mark_offline_puts_to_offline_endpoint() {
    let (url, server) = respond_once(200, "").await;
    backend(&url).mark_offline().await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(
        request.request_line(),
        "PUT /api/mobile/location/offline HTTP/1.1"
    );
}

#[tokio::test]
async fn fetch_campaigns_parses_list() {
    let (url, server) = respond_once(
        200,
        r#"{"campaigns":[{"id":7,"name":"Harvest","xpBonus":20}],"totalApplicators":12}"#,
    )
    .await;
    let list = backend(&url).fetch_campaigns().await.unwrap();

    let request = server.await.unwrap();
    assert_eq!(request.request_line(), "GET /api/mobile/campaigns HTTP/1.1");
    assert_eq!(list.total_applicators, 12);
    assert_eq!(list.campaigns[0].id, "7");
    assert_eq!(list.campaigns[0].xp_bonus, Some(20));
}

#[tokio::test]
async fn push_subscription_is_wrapped() {
    let (url, server) = respond_once(201, "{}").await;
    let subscription = json!({"endpoint": "https://push.example/abc", "keys": {"p256dh": "k"}});
    backend(&url)
        .register_push_subscription(&subscription)
        .await
        .unwrap();

    let request = server.await.unwrap();
    assert_eq!(
        request.request_line(),
        "POST /api/mobile/push-subscription HTTP/1.1"
    );
    assert_eq!(request.json(), json!({ "subscription": subscription }));
}

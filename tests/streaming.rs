//! End-to-end tests for the streaming forwarder.

use std::time::Duration;

use axum::http::StatusCode;
use futures_util::StreamExt;
use request_forwarder::ForwarderConfig;
use serde_json::{json, Value};

mod common;

fn stream_request(target: std::net::SocketAddr) -> Value {
    json!({
        "target": format!("http://{}/", target),
        "data": {"prompt": "hi"},
        "stream": true
    })
}

#[tokio::test]
async fn test_chunks_relayed_as_they_arrive() {
    let (backend, gate) = common::start_gated_stream_backend("ab", "cd").await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert_eq!(res.headers()["x-accel-buffering"], "no");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let mut body = res.bytes_stream();

    // "cd" is not even produced upstream until the first chunk got through.
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first chunk was buffered")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"ab");

    gate.notify_one();

    let mut rest = Vec::new();
    while let Some(chunk) = body.next().await {
        rest.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(rest, b"cd");
}

#[tokio::test]
async fn test_concatenation_equals_upstream_body() {
    let chunks = ["data: one\n\n", "data: two\n\n", "", "data: [DONE]\n\n"].map(str::as_bytes);
    let backend = common::start_stream_backend(chunks.to_vec()).await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let text = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(text, "data: one\n\ndata: two\n\ndata: [DONE]\n\n");
}

#[tokio::test]
async fn test_multibyte_split_across_chunks() {
    let backend = common::start_stream_backend(vec![
        b"caf\xc3".as_slice(),
        b"\xa9 \xf0\x9f".as_slice(),
        b"\x8e\x88".as_slice(),
    ])
    .await;
    let mut config = ForwarderConfig::default();
    config.forward.chunk_delay_ms = 0;
    let forwarder = common::start_forwarder(config).await;

    let text = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(text, "café 🎈");
}

#[tokio::test]
async fn test_upstream_error_status_is_not_streamed() {
    let backend =
        common::start_fixed_backend(429, r#"{"error":{"type":"rate_limit_error"}}"#).await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": {"type": "rate_limit_error"}}));
}

#[tokio::test]
async fn test_upstream_error_with_non_json_body() {
    let backend = common::start_fixed_backend(502, "<html>bad gateway</html>").await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_mid_stream_failure_closes_cleanly() {
    let backend = common::start_broken_stream_backend("partial").await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let text = tokio::time::timeout(Duration::from_secs(5), res.text())
        .await
        .expect("response never closed")
        .unwrap();
    assert_eq!(text, "partial");
}

#[tokio::test]
async fn test_unreachable_target_in_stream_mode() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&json!({"target": format!("http://127.0.0.1:{}/", port), "stream": true}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: Value = res.json().await.unwrap();
    assert!(err["error"].is_string());
}

#[tokio::test]
async fn test_client_disconnect_releases_idle_upstream() {
    let (backend, released) = common::start_stalled_stream_backend("ab").await;
    let forwarder = common::start_forwarder(ForwarderConfig::default()).await;

    let res = common::client()
        .post(forwarder.url())
        .json(&stream_request(backend))
        .send()
        .await
        .unwrap();
    let mut body = res.bytes_stream();
    let first = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first chunk was buffered")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"ab");

    drop(body);

    tokio::time::timeout(Duration::from_secs(5), released.notified())
        .await
        .expect("upstream stayed open after the client left");
}

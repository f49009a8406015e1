//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use futures_util::stream;
use request_forwarder::{ForwarderConfig, ForwarderServer, Shutdown};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Serve `app` on an ephemeral localhost port.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Backend that answers every POST with its request body.
pub async fn start_echo_backend() -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(|body: Bytes| async move {
            ([("content-type", "application/json")], body)
        }),
    ))
    .await
}

/// Backend that answers with the request headers as a JSON object.
pub async fn start_header_echo_backend() -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(|headers: HeaderMap| async move {
            let map: Map<String, Value> = headers
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        Value::String(v.to_str().unwrap_or_default().to_string()),
                    )
                })
                .collect();
            Json(Value::Object(map))
        }),
    ))
    .await
}

/// Backend with a fixed status and body.
pub async fn start_fixed_backend(status: u16, body: &'static str) -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(move || async move {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }),
    ))
    .await
}

/// Backend that waits `delay` before answering.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(move || async move {
            tokio::time::sleep(delay).await;
            Json(serde_json::json!({"late": true}))
        }),
    ))
    .await
}

/// Backend streaming `first`, then waiting on the returned gate, then `second`.
pub async fn start_gated_stream_backend(
    first: &'static str,
    second: &'static str,
) -> (SocketAddr, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let backend_gate = gate.clone();
    let addr = start_backend(Router::new().route(
        "/",
        post(move || {
            let gate = backend_gate.clone();
            async move {
                let chunks = stream::unfold(0u8, move |step| {
                    let gate = gate.clone();
                    async move {
                        match step {
                            0 => Some((Ok::<_, Infallible>(Bytes::from_static(first.as_bytes())), 1)),
                            1 => {
                                gate.notified().await;
                                Some((Ok(Bytes::from_static(second.as_bytes())), 2))
                            }
                            _ => None,
                        }
                    }
                });
                Body::from_stream(chunks)
            }
        }),
    ))
    .await;
    (addr, gate)
}

/// Backend streaming `chunks` with a short pause between each.
pub async fn start_stream_backend(chunks: Vec<&'static [u8]>) -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(move || {
            let chunks = chunks.clone();
            async move {
                let body = stream::unfold(chunks.into_iter(), |mut rest| async move {
                    let chunk = rest.next()?;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Some((Ok::<_, Infallible>(Bytes::from_static(chunk)), rest))
                });
                Body::from_stream(body)
            }
        }),
    ))
    .await
}

/// Notifies when dropped.
struct DropSignal(Arc<Notify>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

/// Backend streaming `first` and then going silent forever.
///
/// The returned handle is notified once the backend's body stream is dropped,
/// i.e. once whoever was reading it has hung up.
pub async fn start_stalled_stream_backend(first: &'static str) -> (SocketAddr, Arc<Notify>) {
    let released = Arc::new(Notify::new());
    let backend_released = released.clone();
    let addr = start_backend(Router::new().route(
        "/",
        post(move || {
            let guard = DropSignal(backend_released.clone());
            async move {
                let body = stream::unfold((true, guard), move |(fresh, guard)| async move {
                    if fresh {
                        let chunk = Bytes::from_static(first.as_bytes());
                        return Some((Ok::<_, Infallible>(chunk), (false, guard)));
                    }
                    std::future::pending::<()>().await;
                    None
                });
                Body::from_stream(body)
            }
        }),
    ))
    .await;
    (addr, released)
}

/// Backend streaming `first` and then failing the body.
pub async fn start_broken_stream_backend(first: &'static str) -> SocketAddr {
    start_backend(Router::new().route(
        "/",
        post(move || async move {
            let body = stream::iter(vec![
                Ok(Bytes::from_static(first.as_bytes())),
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "backend died")),
            ]);
            Body::from_stream(body)
        }),
    ))
    .await
}

/// A running forwarder plus the handle that stops it.
pub struct TestForwarder {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestForwarder {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for TestForwarder {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the forwarder on an ephemeral port.
pub async fn start_forwarder(mut config: ForwarderConfig) -> TestForwarder {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = ForwarderServer::new(config).unwrap();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    TestForwarder { addr, shutdown }
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding route
//! - Wire up middleware (request ID, tracing, CORS, method guard, body limit)
//! - Bind server to listener, plain or TLS
//! - Dispatch validated requests to the forwarder

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, Request},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ForwardConfig, ForwarderConfig};
use crate::forward::{self, upstream::build_client, Mode};
use crate::http::middleware::{cors_gate, method_guard, CorsHeaders};
use crate::http::request::{parse_forward_request, request_id};
use crate::http::response::error_response;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// How long TLS connections get to drain after shutdown is signalled.
const TLS_DRAIN_SECS: u64 = 10;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid CORS configuration: {0}")]
    Cors(#[from] axum::http::header::InvalidHeaderValue),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub forward: Arc<ForwardConfig>,
}

/// HTTP server for the request forwarder.
pub struct ForwarderServer {
    router: Router,
    config: ForwarderConfig,
}

impl ForwarderServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ForwarderConfig) -> Result<Self, ServerError> {
        let state = AppState {
            client: build_client(&config.forward)?,
            forward: Arc::new(config.forward.clone()),
        };
        let cors = Arc::new(CorsHeaders::from_config(&config.cors)?);

        let router = Self::build_router(&config, state, cors);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ForwarderConfig, state: AppState, cors: Arc<CorsHeaders>) -> Router {
        Router::new()
            .route(&config.server.route, any(forward_handler))
            .route_layer(DefaultBodyLimit::max(config.server.max_body_size))
            .route_layer(from_fn(method_guard))
            .with_state(state)
            .layer(from_fn_with_state(cors, cors_gate))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id(req.headers()),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            route = %self.config.server.route,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.recv())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        tracing::info!(
            address = %addr,
            route = %self.config.server.route,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown.recv().await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Forwarding endpoint.
/// Validates the body, then relays to the target in buffered or streaming mode.
async fn forward_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers);

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::info!(request_id = %request_id, error = %rejection, "Unreadable request body");
            metrics::record_rejected(rejection.status().as_u16());
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let request = match parse_forward_request(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(request_id = %request_id, error = %e, "Rejected forward request");
            metrics::record_rejected(e.status().as_u16());
            return e.into_response();
        }
    };

    let mode = Mode::of(&request);
    tracing::debug!(
        request_id = %request_id,
        target = %request.target,
        mode = mode.as_str(),
        "Forwarding request"
    );

    let response = match forward::forward(&state.client, &state.forward, &request, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                target = %request.target,
                error = %e,
                "Upstream error"
            );
            e.into_response()
        }
    };

    metrics::record_request(mode.as_str(), response.status().as_u16(), start_time);
    response
}

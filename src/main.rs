//! Request Forwarder (v1)
//!
//! ```text
//!     Client POST {target, data, headers, stream}
//!     ─────────────────────────────────────────────┐
//!                                                  ▼
//!     ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌────────────────────┐
//!     │   CORS   │──▶│  method  │──▶│ validator │──▶│ buffered/streaming │──▶ target
//!     │   gate   │   │  guard   │   │           │   │     forwarder      │
//!     └──────────┘   └──────────┘   └───────────┘   └────────────────────┘
//!           ▲                                                 │
//!           └────────────── status + JSON / chunked text ◀────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_forwarder::config::{load_config, validation::validate_config, ConfigError, ForwarderConfig};
use request_forwarder::lifecycle::{shutdown_signal, Shutdown};
use request_forwarder::net::load_tls_config;
use request_forwarder::observability::{logging, metrics};
use request_forwarder::ForwarderServer;

#[derive(Parser)]
#[command(name = "request-forwarder", version)]
#[command(about = "Forward JSON POSTs to a caller-chosen target, buffered or streamed", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ForwarderConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("request-forwarder v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        route = %config.server.route,
        buffered_timeout_secs = config.forward.buffered_timeout_secs,
        chunk_delay_ms = config.forward.chunk_delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = ForwarderServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(addr, rustls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Network layer subsystem.
//!
//! Plain HTTP binds a tokio `TcpListener` directly; HTTPS goes through
//! axum-server with the rustls configuration loaded here.

pub mod tls;

pub use tls::load_tls_config;

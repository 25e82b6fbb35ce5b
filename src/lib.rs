//! # Chainproxy - HTTP and SOCKS5 proxy chained through an upstream SOCKS5 hop
//!
//! Chainproxy listens on two ports. One speaks HTTP proxy semantics
//! (`CONNECT` tunnels and plain forwarded requests, Basic proxy
//! authorization), the other speaks SOCKS5 with optional username/password
//! authentication. Whatever the inbound protocol, the destination is never
//! dialed directly: every connection goes through a configured upstream SOCKS5
//! proxy.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainproxy::{load_config, ProxyServer};
//! use std::sync::Arc;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(load_config("config.toml")?);
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     ProxyServer::bind(config).await?.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! HTTP client   -> :http_port   -> HttpProxySession -+
//!                                                    +-> UpstreamConnector -> upstream SOCKS5 -> Target
//! SOCKS5 client -> :socks5_port -> Socks5Session ----+
//! ```
//!
//! Each session owns the client connection until its handshake is over and
//! then hands both legs to a [`RelayBridge`].

#![warn(rust_2018_idioms)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod helper;
pub mod relay;
pub mod server;
pub mod services;
pub mod transport;
pub mod upstream;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use credentials::CredentialStore;
pub use error::{ProxyError, ProxyResult, Socks5Error};
pub use relay::{RelayBridge, RelayStats};
pub use server::ProxyServer;
pub use upstream::UpstreamConnector;

/// Version of the Chainproxy library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

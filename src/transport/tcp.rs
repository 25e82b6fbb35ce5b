//! TCP transport implementation
//!
//! Provides plain, timeout-bounded TCP connections.

use super::{AddrMaybeCached, SocketOpts};
use crate::config::TcpConfig;
use crate::error::{ProxyError, ProxyResult};
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP transport for plain connections
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a new TCP transport with default options
    pub fn with_defaults() -> Self {
        TcpTransport {
            socket_opts: SocketOpts::default(),
            connect_timeout: Duration::from_secs(crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Create a transport from the `[tcp]` configuration section
    pub fn from_config(config: &TcpConfig, connect_timeout: Duration) -> Self {
        TcpTransport {
            socket_opts: SocketOpts::from_tcp_config(config),
            connect_timeout,
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The configured connection timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connect to a remote address
    ///
    /// A refused or timed-out connect clears the cached resolution so the
    /// next attempt looks the name up again.
    pub async fn connect(&self, addr: &AddrMaybeCached) -> ProxyResult<TcpStream> {
        let resolved = addr.resolve().await?;

        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(resolved))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                addr.clear_cache().await;
                return Err(ProxyError::UpstreamDial(format!(
                    "Failed to connect to {}: {}",
                    addr.addr(),
                    e
                )));
            }
            Err(_) => {
                addr.clear_cache().await;
                return Err(ProxyError::Timeout(format!(
                    "Connection timeout to {}",
                    addr.addr()
                )));
            }
        };

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        tracing::debug!("TCP connection established to {}", resolved);

        Ok(stream)
    }
}

//! Outbound leg: every destination is reached through the upstream SOCKS5 proxy
//!
//! A dial is a TCP connect to the configured upstream followed by a SOCKS5
//! CONNECT handshake, no authentication. The whole dial is bounded by the
//! configured connect timeout.

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::helper::duration_from_secs;
use crate::services::socks::TargetAddr;
use crate::transport::{AddrMaybeCached, TcpTransport};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::debug;

/// Dials destinations through the upstream SOCKS5 proxy
#[derive(Debug, Clone)]
pub struct UpstreamConnector {
    proxy_addr: AddrMaybeCached,
    transport: TcpTransport,
    timeout: Duration,
}

impl UpstreamConnector {
    /// Build a connector for `proxy_host:proxy_port`
    pub fn from_config(config: &Config) -> Self {
        let timeout = duration_from_secs(config.connect_timeout);
        UpstreamConnector {
            proxy_addr: AddrMaybeCached::new(&config.upstream_addr()),
            transport: TcpTransport::from_config(&config.tcp, timeout),
            timeout,
        }
    }

    /// Build a connector for an explicit upstream address
    pub fn new(proxy_addr: AddrMaybeCached, transport: TcpTransport) -> Self {
        let timeout = transport.connect_timeout();
        UpstreamConnector {
            proxy_addr,
            transport,
            timeout,
        }
    }

    /// Address of the upstream proxy as configured
    pub fn proxy_addr(&self) -> &str {
        self.proxy_addr.addr()
    }

    /// Open a stream to `target` through the upstream proxy.
    ///
    /// On any failure the partially set up stream is dropped, which closes it.
    pub async fn connect(&self, target: &TargetAddr) -> ProxyResult<TcpStream> {
        match tokio::time::timeout(self.timeout, self.dial(target)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout(format!(
                "Dial to {} via {} timed out after {:?}",
                target,
                self.proxy_addr.addr(),
                self.timeout
            ))),
        }
    }

    async fn dial(&self, target: &TargetAddr) -> ProxyResult<TcpStream> {
        let stream = self.transport.connect(&self.proxy_addr).await?;

        // Coalesce the handshake frames; reads pass straight through so no
        // destination bytes are left behind in a buffer
        let mut stream = BufWriter::new(stream);
        async_socks5::connect(&mut stream, target.to_addr_kind(), None)
            .await
            .map_err(|e| {
                ProxyError::UpstreamDial(format!(
                    "Upstream {} refused CONNECT to {}: {}",
                    self.proxy_addr.addr(),
                    target,
                    e
                ))
            })?;
        stream.flush().await?;

        debug!("Upstream tunnel to {} established", target);
        Ok(stream.into_inner())
    }
}

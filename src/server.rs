//! Listener side of the proxy
//!
//! Binds the HTTP and SOCKS5 listeners and spawns one task per accepted
//! connection. A session error only ends its own connection.

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::services::{create_service_handlers, ServiceHandler};
use crate::transport::SocketOpts;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// The dual-protocol proxy server
pub struct ProxyServer {
    config: Arc<Config>,
    http_listener: TcpListener,
    socks_listener: TcpListener,
    http_handler: Arc<dyn ServiceHandler>,
    socks_handler: Arc<dyn ServiceHandler>,
}

impl ProxyServer {
    /// Validate the configuration and bind both listeners
    pub async fn bind(config: Arc<Config>) -> ProxyResult<Self> {
        config.validate().map_err(ProxyError::Config)?;

        let http_listener = bind_listener(&config.http_listen_addr()).await?;
        let socks_listener = bind_listener(&config.socks5_listen_addr()).await?;

        Self::from_listeners(config, http_listener, socks_listener)
    }

    /// Serve on already bound listeners; listen ports in `config` are ignored
    pub fn from_listeners(
        config: Arc<Config>,
        http_listener: TcpListener,
        socks_listener: TcpListener,
    ) -> ProxyResult<Self> {
        let (http_handler, socks_handler) = create_service_handlers(&config)?;
        Ok(ProxyServer {
            config,
            http_listener,
            socks_listener,
            http_handler,
            socks_handler,
        })
    }

    /// Local address of the HTTP listener
    pub fn http_addr(&self) -> ProxyResult<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    /// Local address of the SOCKS5 listener
    pub fn socks5_addr(&self) -> ProxyResult<SocketAddr> {
        Ok(self.socks_listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> ProxyResult<()> {
        info!("HTTP proxy listening on {}", self.http_addr()?);
        info!("SOCKS5 proxy listening on {}", self.socks5_addr()?);
        info!(
            "Chaining through upstream SOCKS5 proxy {} (SOCKS5 auth {})",
            self.config.upstream_addr(),
            if self.config.enable_auth { "enabled" } else { "disabled" }
        );

        loop {
            tokio::select! {
                accepted = self.http_listener.accept() => {
                    self.dispatch(accepted, &self.http_handler).await;
                }
                accepted = self.socks_listener.accept() => {
                    self.dispatch(accepted, &self.socks_handler).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listeners");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    async fn dispatch(
        &self,
        accepted: io::Result<(TcpStream, SocketAddr)>,
        handler: &Arc<dyn ServiceHandler>,
    ) {
        let (stream, peer) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept {} connection: {}", handler.service_type(), e);
                tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                return;
            }
        };

        if let Err(e) = SocketOpts::for_client_socket().apply(&stream) {
            warn!("Failed to apply socket options for {}: {}", peer, e);
        }
        debug!("Accepted {} connection from {}", handler.service_type(), peer);

        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.handle_tcp_stream(Box::new(stream), peer).await {
                log_session_error(handler.service_type(), peer, &e);
            }
        });
    }
}

async fn bind_listener(addr: &str) -> ProxyResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ProxyError::Config(format!("Failed to bind {}: {}", addr, e)))
}

fn log_session_error(service: &str, peer: SocketAddr, e: &ProxyError) {
    match e {
        ProxyError::Auth(_) | ProxyError::UpstreamDial(_) | ProxyError::Timeout(_) => {
            warn!("{} session {} failed: {}", service, peer, e)
        }
        ProxyError::Io(_) => debug!("{} session {} ended: {}", service, peer, e),
        _ => info!("{} session {} closed: {}", service, peer, e),
    }
}

//! HTTP/HTTPS proxy listener service
//!
//! Accepts `CONNECT host:port` tunnels and plain absolute-form requests.
//! Every request must carry `Proxy-Authorization: Basic`; the destination is
//! taken from the `Host` header and reached through the upstream proxy.

mod auth;
mod frame;
mod head;
mod session;

pub use auth::{authorize, BasicCredential, PROXY_AUTHORIZATION};
pub use frame::{FrameReader, ParseResult, DEFAULT_MAX_HEAD_BYTES};
pub use head::{parse_host_port, HttpRequestHead, DEFAULT_CONNECT_PORT, DEFAULT_HTTP_PORT};
pub use session::{HttpProxySession, HttpSessionState, CONNECT_ESTABLISHED};

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{ProxyError, ProxyResult};
use crate::services::{ServiceHandler, StreamDyn};
use crate::upstream::UpstreamConnector;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// HTTP proxy service handler implementing the [`ServiceHandler`] trait.
#[derive(Debug, Clone)]
pub struct HttpProxyServiceHandler {
    max_head_bytes: usize,
    credentials: Arc<CredentialStore>,
    connector: Arc<UpstreamConnector>,
}

impl HttpProxyServiceHandler {
    pub fn new(
        max_head_bytes: usize,
        credentials: Arc<CredentialStore>,
        connector: Arc<UpstreamConnector>,
    ) -> Self {
        Self {
            max_head_bytes,
            credentials,
            connector,
        }
    }

    /// Create a handler from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_head_bytes,
            Arc::new(CredentialStore::from_config(config)),
            Arc::new(UpstreamConnector::from_config(config)),
        )
    }
}

#[async_trait::async_trait]
impl ServiceHandler for HttpProxyServiceHandler {
    fn service_type(&self) -> &str {
        "http"
    }

    async fn handle_tcp_stream(
        &self,
        stream: Box<dyn StreamDyn>,
        peer: SocketAddr,
    ) -> ProxyResult<()> {
        let session = HttpProxySession::new(
            stream,
            peer,
            self.max_head_bytes,
            self.credentials.clone(),
            self.connector.clone(),
        );
        let stats = session.run().await?;
        debug!(
            "HTTP session {} closed: {} bytes up, {} bytes down",
            peer, stats.a_to_b, stats.b_to_a
        );
        Ok(())
    }

    fn validate(&self) -> ProxyResult<()> {
        if self.max_head_bytes == 0 {
            return Err(ProxyError::Config(
                "max_head_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_service_handler_from_config() {
        let handler = HttpProxyServiceHandler::from_config(&Config::default());
        assert_eq!(handler.service_type(), "http");
        assert!(handler.validate().is_ok());
    }

    #[test]
    fn test_http_service_handler_rejects_zero_head_cap() {
        let config = Config {
            max_head_bytes: 0,
            ..Default::default()
        };
        let handler = HttpProxyServiceHandler::from_config(&config);
        assert!(handler.validate().is_err());
    }
}

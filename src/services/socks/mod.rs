//! SOCKS5 listener service
//!
//! Serves RFC 1928 CONNECT requests, optionally guarded by RFC 1929
//! username/password authentication, and dials every destination through the
//! upstream proxy. BIND and UDP ASSOCIATE are refused.

mod auth;
mod command;
mod consts;
mod handshake;
mod session;
mod types;

pub use auth::AuthMethod;
pub use command::{build_reply, parse_command, CommandRequest};
pub use consts::*;
pub use handshake::{HandshakeAction, HandshakeState, Socks5Handshake};
pub use session::Socks5Session;
pub use types::{SocksCommand, TargetAddr};

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::ProxyResult;
use crate::services::{ServiceHandler, StreamDyn};
use crate::upstream::UpstreamConnector;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// SOCKS5 service handler implementing the [`ServiceHandler`] trait.
#[derive(Debug, Clone)]
pub struct Socks5ServiceHandler {
    auth_enabled: bool,
    credentials: Arc<CredentialStore>,
    connector: Arc<UpstreamConnector>,
}

impl Socks5ServiceHandler {
    /// Create a new SOCKS5 service handler.
    pub fn new(
        auth_enabled: bool,
        credentials: Arc<CredentialStore>,
        connector: Arc<UpstreamConnector>,
    ) -> Self {
        Self {
            auth_enabled,
            credentials,
            connector,
        }
    }

    /// Create a handler from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.enable_auth,
            Arc::new(CredentialStore::from_config(config)),
            Arc::new(UpstreamConnector::from_config(config)),
        )
    }

    /// Whether clients must authenticate with username/password.
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }
}

#[async_trait::async_trait]
impl ServiceHandler for Socks5ServiceHandler {
    fn service_type(&self) -> &str {
        "socks5"
    }

    async fn handle_tcp_stream(
        &self,
        stream: Box<dyn StreamDyn>,
        peer: SocketAddr,
    ) -> ProxyResult<()> {
        let session = Socks5Session::new(
            stream,
            peer,
            self.auth_enabled,
            self.credentials.clone(),
            self.connector.clone(),
        );
        let stats = session.run().await?;
        debug!(
            "SOCKS5 session {} closed: {} bytes up, {} bytes down",
            peer, stats.a_to_b, stats.b_to_a
        );
        Ok(())
    }

    fn validate(&self) -> ProxyResult<()> {
        if self.auth_enabled && self.credentials.is_empty() {
            return Err(crate::error::ProxyError::Config(
                "SOCKS5 authentication enabled without any users".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks5_service_handler_from_config() {
        let handler = Socks5ServiceHandler::from_config(&Config::default());
        assert_eq!(handler.service_type(), "socks5");
        assert!(!handler.auth_enabled());
        assert!(handler.validate().is_ok());
    }

    #[test]
    fn test_socks5_service_handler_validate_requires_users() {
        let mut config = Config::default();
        config.enable_auth = true;
        let handler = Socks5ServiceHandler::from_config(&config);
        assert!(handler.validate().is_err());

        config.auth.insert("user".to_string(), "pass".to_string());
        let handler = Socks5ServiceHandler::from_config(&config);
        assert!(handler.validate().is_ok());
    }

    #[test]
    fn test_socks5_service_handler_debug() {
        let handler = Socks5ServiceHandler::from_config(&Config::default());
        let debug_str = format!("{:?}", handler);
        assert!(debug_str.contains("Socks5ServiceHandler"));
    }
}

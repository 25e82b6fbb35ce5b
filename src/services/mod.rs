//! Inbound protocol services
//!
//! Each listener owns one [`ServiceHandler`]. The server accepts a
//! connection, boxes it as a [`StreamDyn`] and hands it to the handler of
//! the listener it arrived on, which runs the protocol through to the relay.

pub mod http;
pub mod socks;

use crate::config::Config;
use crate::error::ProxyResult;
use std::fmt::Debug;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

pub use http::HttpProxyServiceHandler;
pub use socks::Socks5ServiceHandler;

/// Trait that all inbound protocol handlers implement.
///
/// # Example
///
/// ```rust,ignore
/// use chainproxy::services::{ServiceHandler, StreamDyn};
///
/// #[derive(Debug)]
/// struct MyHandler;
///
/// #[async_trait::async_trait]
/// impl ServiceHandler for MyHandler {
///     fn service_type(&self) -> &str { "my_service" }
///
///     async fn handle_tcp_stream(
///         &self,
///         stream: Box<dyn StreamDyn>,
///         peer: std::net::SocketAddr,
///     ) -> chainproxy::ProxyResult<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait ServiceHandler: Send + Sync + Debug {
    /// Human-readable name of this service type (e.g., "socks5", "http").
    fn service_type(&self) -> &str;

    /// Serve one accepted client connection until it closes.
    async fn handle_tcp_stream(&self, stream: Box<dyn StreamDyn>, peer: SocketAddr)
        -> ProxyResult<()>;

    /// Validate the handler's configuration.
    ///
    /// Called once during startup. Default implementation always succeeds.
    fn validate(&self) -> ProxyResult<()> {
        Ok(())
    }
}

/// A dynamic stream trait for service handlers.
///
/// Lets handlers accept any stream type (TCP, in-memory duplex in tests)
/// without being generic over the transport.
pub trait StreamDyn: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

/// Blanket implementation: any type implementing the required traits is a StreamDyn.
impl<T: AsyncRead + AsyncWrite + Unpin + Send + Debug> StreamDyn for T {}

/// Build and validate the handlers for both listeners, HTTP first.
///
/// Both handlers share one credential table and one upstream connector.
pub fn create_service_handlers(
    config: &Config,
) -> ProxyResult<(Arc<dyn ServiceHandler>, Arc<dyn ServiceHandler>)> {
    let credentials = Arc::new(crate::credentials::CredentialStore::from_config(config));
    let connector = Arc::new(crate::upstream::UpstreamConnector::from_config(config));

    let http = HttpProxyServiceHandler::new(
        config.max_head_bytes,
        credentials.clone(),
        connector.clone(),
    );
    http.validate()?;

    let socks = Socks5ServiceHandler::new(config.enable_auth, credentials, connector);
    socks.validate()?;

    Ok((Arc::new(http), Arc::new(socks)))
}

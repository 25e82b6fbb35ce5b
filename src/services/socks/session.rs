//! One SOCKS5 client connection, from greeting to relay
//!
//! The session pulls bytes from the client, lets [`Socks5Handshake`] decide
//! what to answer, dials the requested destination through the upstream
//! proxy and finally hands both streams to the [`RelayBridge`]. Any error
//! closes the client before it is returned.

use super::handshake::{HandshakeAction, Socks5Handshake};
use crate::credentials::CredentialStore;
use crate::error::{ProxyError, ProxyResult};
use crate::helper::{flush_and_close, DEFAULT_BUFFER_SIZE};
use crate::relay::{RelayBridge, RelayStats};
use crate::upstream::UpstreamConnector;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// A SOCKS5 client connection being served
pub struct Socks5Session<S> {
    client: S,
    peer: SocketAddr,
    handshake: Socks5Handshake,
    connector: Arc<UpstreamConnector>,
}

impl<S> Socks5Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        client: S,
        peer: SocketAddr,
        auth_enabled: bool,
        credentials: Arc<CredentialStore>,
        connector: Arc<UpstreamConnector>,
    ) -> Self {
        Socks5Session {
            client,
            peer,
            handshake: Socks5Handshake::new(auth_enabled, credentials),
            connector,
        }
    }

    /// Serve the connection until either side closes
    pub async fn run(mut self) -> ProxyResult<RelayStats> {
        let mut upstream = match self.negotiate().await {
            Ok(upstream) => upstream,
            Err(e) => {
                flush_and_close(&mut self.client).await;
                return Err(e);
            }
        };

        let early = self.handshake.take_remaining();
        if !early.is_empty() {
            debug!("Forwarding {} early bytes from {}", early.len(), self.peer);
            if let Err(e) = upstream.write_all(&early).await {
                flush_and_close(&mut self.client).await;
                flush_and_close(&mut upstream).await;
                return Err(e.into());
            }
        }

        Ok(RelayBridge::new(self.client, upstream).run().await)
    }

    async fn negotiate(&mut self) -> ProxyResult<TcpStream> {
        let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];

        loop {
            match self.handshake.advance()? {
                HandshakeAction::NeedMore => {
                    let n = self.client.read(&mut buf).await?;
                    if n == 0 {
                        return Err(ProxyError::Io(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!(
                                "client closed during SOCKS5 handshake ({:?})",
                                self.handshake.state()
                            ),
                        )));
                    }
                    self.handshake.feed(&buf[..n]);
                }
                HandshakeAction::Reply(reply) => {
                    self.client.write_all(&reply).await?;
                }
                HandshakeAction::Reject(reply) => {
                    self.client.write_all(&reply).await?;
                    return Err(ProxyError::Auth(format!(
                        "SOCKS5 credentials rejected for {}",
                        self.peer
                    )));
                }
                HandshakeAction::Connect(target) => {
                    info!("SOCKS5 CONNECT {} -> {}", self.peer, target);

                    return match self.connector.connect(&target).await {
                        Ok(upstream) => {
                            let reply = self.handshake.connect_succeeded();
                            self.client.write_all(&reply).await?;
                            Ok(upstream)
                        }
                        Err(e) => {
                            warn!("SOCKS5 dial to {} failed: {}", target, e);
                            let reply = self.handshake.connect_failed();
                            if let Err(write_err) = self.client.write_all(&reply).await {
                                debug!(
                                    "Failed to send SOCKS5 failure reply to {}: {}",
                                    self.peer, write_err
                                );
                            }
                            Err(e)
                        }
                    };
                }
            }
        }
    }
}

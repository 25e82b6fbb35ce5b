//! One HTTP proxy client connection
//!
//! The session reads until one request head is complete, checks its Basic
//! credentials, dials the destination through the upstream proxy and then
//! becomes a plain relay. Client reads are suspended from the moment the head
//! completes until the dial has resolved, so at most one head plus one read
//! buffer is held per connection. Every failure closes the client without an
//! HTTP response.

use super::auth::authorize;
use super::frame::FrameReader;
use crate::credentials::CredentialStore;
use crate::error::{ProxyError, ProxyResult};
use crate::helper::{flush_and_close, DEFAULT_BUFFER_SIZE};
use crate::relay::{RelayBridge, RelayStats};
use crate::upstream::UpstreamConnector;
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Response sent to a CONNECT client once its tunnel is up
pub const CONNECT_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Stage of an HTTP proxy session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpSessionState {
    ParsingHead,
    Authorizing,
    ConnectEstablishing,
    ForwardConnecting,
    Relaying,
    Closed,
}

/// An HTTP proxy client connection being served
pub struct HttpProxySession<S> {
    client: S,
    peer: SocketAddr,
    state: HttpSessionState,
    reader: FrameReader,
    accepting_client_reads: bool,
    credentials: Arc<CredentialStore>,
    connector: Arc<UpstreamConnector>,
}

impl<S> HttpProxySession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        client: S,
        peer: SocketAddr,
        max_head_bytes: usize,
        credentials: Arc<CredentialStore>,
        connector: Arc<UpstreamConnector>,
    ) -> Self {
        HttpProxySession {
            client,
            peer,
            state: HttpSessionState::ParsingHead,
            reader: FrameReader::new(max_head_bytes),
            accepting_client_reads: true,
            credentials,
            connector,
        }
    }

    /// Serve the connection until either side closes
    pub async fn run(mut self) -> ProxyResult<RelayStats> {
        match self.establish().await {
            Ok(upstream) => {
                self.transition(HttpSessionState::Relaying);
                let stats = RelayBridge::new(self.client, upstream).run().await;
                Ok(stats)
            }
            Err(e) => {
                self.transition(HttpSessionState::Closed);
                flush_and_close(&mut self.client).await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> ProxyResult<TcpStream> {
        let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];
        let mut leftover = BytesMut::new();

        while self.accepting_client_reads {
            let n = self.client.read(&mut buf).await?;
            if n == 0 {
                return Err(ProxyError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "client closed before the request head was complete",
                )));
            }

            let result = self.reader.feed(&buf[..n])?;
            if result.complete {
                leftover.extend_from_slice(&buf[result.consumed..n]);
                self.accepting_client_reads = false;
            }
        }

        self.transition(HttpSessionState::Authorizing);
        let head = self.reader.head();
        let username = authorize(head, &self.credentials)?;

        let is_connect = head.is_connect();
        let target = head.target();
        info!("HTTP {} from {} (user {})", head.desc(), self.peer, username);

        self.transition(if is_connect {
            HttpSessionState::ConnectEstablishing
        } else {
            HttpSessionState::ForwardConnecting
        });

        let mut upstream = match self.connector.connect(&target).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!("HTTP dial to {} failed: {}", target, e);
                return Err(e);
            }
        };
        self.accepting_client_reads = true;

        if is_connect {
            self.client.write_all(CONNECT_ESTABLISHED).await?;
        } else {
            upstream.write_all(self.reader.head().raw_bytes()).await?;
        }
        if !leftover.is_empty() {
            debug!("Forwarding {} bytes read past the head", leftover.len());
            upstream.write_all(&leftover).await?;
        }

        Ok(upstream)
    }

    fn transition(&mut self, next: HttpSessionState) {
        debug!("HTTP session {}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }
}

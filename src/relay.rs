//! Bidirectional byte relay between a client and its upstream leg
//!
//! Bytes are copied in both directions concurrently. The first direction to
//! see EOF or an error ends the relay and both sides are closed; half-closed
//! connections are not kept open.

use crate::helper::{flush_and_close, DEFAULT_BUFFER_SIZE};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Bytes moved by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the first stream into the second
    pub a_to_b: u64,
    /// Bytes copied from the second stream into the first
    pub b_to_a: u64,
}

/// Couples two established streams until either side closes
#[derive(Debug)]
pub struct RelayBridge<A, B> {
    a: A,
    b: B,
}

impl<A, B> RelayBridge<A, B>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    /// Bridge `a` (usually the client) with `b` (usually the upstream)
    pub fn new(a: A, b: B) -> Self {
        RelayBridge { a, b }
    }

    /// Run until one direction finishes, then close both write sides.
    ///
    /// Read and write errors end the relay like EOF does; they are logged and
    /// not returned.
    pub async fn run(self) -> RelayStats {
        let (mut a_read, mut a_write) = tokio::io::split(self.a);
        let (mut b_read, mut b_write) = tokio::io::split(self.b);

        let mut stats = RelayStats::default();

        {
            let a_to_b = pump(&mut a_read, &mut b_write, &mut stats.a_to_b);
            let b_to_a = pump(&mut b_read, &mut a_write, &mut stats.b_to_a);

            tokio::select! {
                result = a_to_b => {
                    match result {
                        Ok(()) => debug!("A->B reached EOF"),
                        Err(e) => debug!("A->B error: {}", e),
                    }
                }
                result = b_to_a => {
                    match result {
                        Ok(()) => debug!("B->A reached EOF"),
                        Err(e) => debug!("B->A error: {}", e),
                    }
                }
            }
        }

        flush_and_close(&mut a_write).await;
        flush_and_close(&mut b_write).await;

        debug!(
            "Relay finished: {} bytes A->B, {} bytes B->A",
            stats.a_to_b, stats.b_to_a
        );
        stats
    }
}

async fn pump<R, W>(reader: &mut R, writer: &mut W, counter: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; DEFAULT_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        *counter += n as u64;
    }
}

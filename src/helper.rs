//! Helper utilities for Chainproxy
//!
//! This module provides common utility functions used throughout the application.

use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Default buffer size for reads from the client during a handshake
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Flush pending writes and shut the write side down.
///
/// Errors are swallowed: closing an already-closed stream is a no-op.
pub async fn flush_and_close<S>(stream: &mut S)
where
    S: AsyncWrite + Unpin + ?Sized,
{
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

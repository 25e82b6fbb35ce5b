//! Upstream address handling with DNS caching
//!
//! The upstream proxy address never changes for the life of the process, so
//! its resolution is cached and only redone after a failed dial.

use crate::error::{ProxyError, ProxyResult};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Address that may have a cached resolved address
#[derive(Debug, Clone)]
pub struct AddrMaybeCached {
    /// The original address string
    addr: String,
    /// Cached resolved address
    cached: Arc<RwLock<Option<SocketAddr>>>,
}

impl AddrMaybeCached {
    /// Create a new address without cached resolution
    pub fn new(addr: &str) -> Self {
        AddrMaybeCached {
            addr: addr.to_string(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the original address string
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Get the cached address if available
    pub async fn get_cached(&self) -> Option<SocketAddr> {
        *self.cached.read().await
    }

    /// Set the cached address
    pub async fn set_cached(&self, addr: SocketAddr) {
        *self.cached.write().await = Some(addr);
    }

    /// Clear the cached address
    pub async fn clear_cache(&self) {
        *self.cached.write().await = None;
    }

    /// Resolve the address, using cache if available
    pub async fn resolve(&self) -> ProxyResult<SocketAddr> {
        if let Some(cached) = self.get_cached().await {
            return Ok(cached);
        }

        let resolved = self.resolve_fresh().await?;
        self.set_cached(resolved).await;

        Ok(resolved)
    }

    /// Resolve the address without using cache
    pub async fn resolve_fresh(&self) -> ProxyResult<SocketAddr> {
        tokio::net::lookup_host(self.addr.as_str())
            .await
            .map_err(|e| {
                ProxyError::UpstreamDial(format!("Failed to resolve address {}: {}", self.addr, e))
            })?
            .next()
            .ok_or_else(|| {
                ProxyError::UpstreamDial(format!("No addresses found for: {}", self.addr))
            })
    }
}

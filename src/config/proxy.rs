//! Proxy configuration types
//!
//! Defines the read-only configuration shared by every session.

use super::TcpConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_socks5_port() -> u16 {
    8991
}

fn default_http_port() -> u16 {
    8992
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_proxy_host() -> String {
    "127.0.0.1".to_string()
}

fn default_proxy_port() -> u16 {
    1080
}

/// Default upstream dial timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

fn default_max_head_bytes() -> usize {
    64 * 1024
}

/// Root configuration structure
///
/// Loaded once at startup and shared by all sessions behind an `Arc`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Port of the SOCKS5 listener
    #[serde(default = "default_socks5_port")]
    pub socks5_port: u16,

    /// Port of the HTTP/HTTPS proxy listener
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Address both listeners bind to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Require username/password on the SOCKS5 listener
    #[serde(default)]
    pub enable_auth: bool,

    /// Credential table, username to password
    #[serde(default)]
    pub auth: HashMap<String, String>,

    /// Upstream SOCKS5 proxy host
    #[serde(default = "default_proxy_host")]
    pub proxy_host: String,

    /// Upstream SOCKS5 proxy port
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,

    /// Upstream dial timeout in seconds, covering connect and handshake
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Largest HTTP request head accepted before the connection is dropped
    #[serde(default = "default_max_head_bytes")]
    pub max_head_bytes: usize,

    /// Socket options for outbound connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            socks5_port: default_socks5_port(),
            http_port: default_http_port(),
            bind_addr: default_bind_addr(),
            enable_auth: false,
            auth: HashMap::new(),
            proxy_host: default_proxy_host(),
            proxy_port: default_proxy_port(),
            connect_timeout: default_connect_timeout(),
            max_head_bytes: default_max_head_bytes(),
            tcp: TcpConfig::default(),
        }
    }
}

impl Config {
    /// Address of the upstream SOCKS5 proxy as `host:port`
    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }

    /// Listen address of the HTTP proxy
    pub fn http_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }

    /// Listen address of the SOCKS5 proxy
    pub fn socks5_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.socks5_port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.enable_auth && self.auth.is_empty() {
            return Err("Authentication enabled but no credentials configured".to_string());
        }
        if self.http_port == 0 || self.socks5_port == 0 {
            return Err("Listener ports must be non-zero".to_string());
        }
        if self.http_port == self.socks5_port {
            return Err(format!(
                "HTTP and SOCKS5 listeners cannot share port {}",
                self.http_port
            ));
        }
        if self.proxy_port == 0 {
            return Err("Upstream proxy port must be non-zero".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be at least one second".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.socks5_port, 8991);
        assert_eq!(config.http_port, 8992);
        assert!(!config.enable_auth);
        assert!(config.auth.is_empty());
        assert_eq!(config.proxy_host, "127.0.0.1");
        assert_eq!(config.proxy_port, 1080);
        assert_eq!(config.connect_timeout, 10);
    }

    #[test]
    fn test_upstream_addr() {
        let config = Config {
            proxy_host: "10.0.0.2".to_string(),
            proxy_port: 9050,
            ..Default::default()
        };
        assert_eq!(config.upstream_addr(), "10.0.0.2:9050");
    }

    #[test]
    fn test_listen_addrs() {
        let config = Config {
            bind_addr: "127.0.0.1".to_string(),
            ..Default::default()
        };
        assert_eq!(config.http_listen_addr(), "127.0.0.1:8992");
        assert_eq!(config.socks5_listen_addr(), "127.0.0.1:8991");
    }

    #[test]
    fn test_config_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            enable_auth: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut auth = HashMap::new();
        auth.insert("user".to_string(), "pass".to_string());
        let config = Config {
            enable_auth: true,
            auth,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            http_port: 9000,
            socks5_port: 9000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            connect_timeout: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Configuration module for Chainproxy
//!
//! This module provides configuration types and parsing for the proxy.

mod proxy;
mod transport;

pub use proxy::Config;
pub use transport::TcpConfig;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.socks5_port, 8991);
        assert_eq!(config.http_port, 8992);
        assert_eq!(config.upstream_addr(), "127.0.0.1:1080");
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
socks5_port = 1081
http_port = 8080
bind_addr = "127.0.0.1"
enable_auth = true
proxy_host = "upstream.example.com"
proxy_port = 9050
connect_timeout = 5
max_head_bytes = 16384

[auth]
alice = "wonderland"
bob = "builder"

[tcp]
nodelay = false
keepalive_secs = 30
keepalive_interval = 10
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.socks5_port, 1081);
        assert_eq!(config.http_port, 8080);
        assert!(config.enable_auth);
        assert_eq!(config.auth.get("alice"), Some(&"wonderland".to_string()));
        assert_eq!(config.auth.len(), 2);
        assert_eq!(config.upstream_addr(), "upstream.example.com:9050");
        assert_eq!(config.connect_timeout, 5);
        assert_eq!(config.max_head_bytes, 16384);
        assert!(!config.tcp.nodelay);
    }

    #[test]
    fn test_parse_config_rejects_auth_without_users() {
        let result = parse_config("enable_auth = true");
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("no credentials"));
    }

    #[test]
    fn test_parse_config_rejects_garbage() {
        assert!(parse_config("socks5_port = \"not a port\"").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port = 3128").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.http_port, 3128);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/chainproxy.toml");
        assert!(result.is_err());
    }
}

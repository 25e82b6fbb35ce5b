//! Parsed HTTP proxy request head

use crate::error::{ProxyError, ProxyResult};
use crate::services::socks::TargetAddr;
use bytes::Bytes;
use std::collections::HashMap;

/// Default destination port for CONNECT requests without an explicit port
pub const DEFAULT_CONNECT_PORT: u16 = 443;
/// Default destination port for plain requests without an explicit port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// An HTTP proxy request head, filled in line by line by the
/// [`FrameReader`](super::FrameReader)
#[derive(Debug, Clone, Default)]
pub struct HttpRequestHead {
    method: String,
    is_connect: bool,
    host: String,
    port: u16,
    headers: HashMap<String, String>,
    raw_bytes: Bytes,
    complete: bool,
}

impl HttpRequestHead {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether this is a CONNECT tunnel request
    pub fn is_connect(&self) -> bool {
        self.is_connect
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keyed by lower-cased name
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The head exactly as received, terminator included
    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw_bytes
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Destination of the request
    pub fn target(&self) -> TargetAddr {
        TargetAddr::from_host_port(&self.host, self.port)
    }

    /// Short description for logs
    pub fn desc(&self) -> String {
        format!("{} {}:{}", self.method, self.host, self.port)
    }

    pub(super) fn apply_request_line(&mut self, line: &str) -> ProxyResult<()> {
        let method = line
            .split(' ')
            .find(|token| !token.is_empty())
            .ok_or_else(|| ProxyError::Parse("empty request line".to_string()))?;

        self.method = method.to_string();
        self.is_connect = self.method == "CONNECT";
        Ok(())
    }

    pub(super) fn apply_header_line(&mut self, line: &str) -> ProxyResult<()> {
        let Some((name, value)) = line.split_once(':') else {
            return Ok(());
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();

        if name == "host" {
            let default_port = if self.is_connect {
                DEFAULT_CONNECT_PORT
            } else {
                DEFAULT_HTTP_PORT
            };
            let (host, port) = parse_host_port(value, default_port)?;
            self.host = host;
            self.port = port;
        }

        self.headers.insert(name, value.to_string());
        Ok(())
    }

    pub(super) fn finish(&mut self, raw_bytes: Bytes) -> ProxyResult<()> {
        if self.host.is_empty() || self.port == 0 {
            return Err(ProxyError::Parse(format!(
                "request head without a destination: '{}'",
                self.desc()
            )));
        }
        self.raw_bytes = raw_bytes;
        self.complete = true;
        Ok(())
    }
}

/// Split a `Host` header value into host and port.
///
/// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`. A bare IPv6 literal
/// without brackets is taken as a host with the default port.
pub fn parse_host_port(value: &str, default_port: u16) -> ProxyResult<(String, u16)> {
    let bad_port =
        |port: &str| ProxyError::Parse(format!("invalid port '{}' in host '{}'", port, value));

    if let Some(rest) = value.strip_prefix('[') {
        let (host, rest) = rest
            .split_once(']')
            .ok_or_else(|| ProxyError::Parse(format!("unterminated IPv6 host '{}'", value)))?;
        let port = match rest.strip_prefix(':') {
            Some(port) => port.parse().map_err(|_| bad_port(port))?,
            None if rest.is_empty() => default_port,
            None => return Err(bad_port(rest)),
        };
        return Ok((host.to_string(), port));
    }

    match value.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => Ok((value.to_string(), default_port)),
        Some((host, port)) => {
            let port = port.parse().map_err(|_| bad_port(port))?;
            Ok((host.to_string(), port))
        }
        None => Ok((value.to_string(), default_port)),
    }
}

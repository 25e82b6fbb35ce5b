//! Error types for Chainproxy
//!
//! This module defines the error taxonomy shared by both inbound protocols.
//! Every variant is handled at the session boundary: the offending connection
//! is closed and the listener keeps accepting.

use std::io;
use thiserror::Error;

/// Main error type for proxy sessions
#[derive(Error, Debug)]
pub enum ProxyError {
    /// IO error on either leg of a session
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed protocol head, fatal to the connection
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or invalid credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The upstream proxy could not be reached or refused the request
    #[error("Upstream dial error: {0}")]
    UpstreamDial(String),

    /// A valid frame asking for something this proxy does not implement
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),
}

impl ProxyError {
    /// Whether this error came from the outbound leg
    pub fn is_dial_failure(&self) -> bool {
        matches!(self, ProxyError::UpstreamDial(_) | ProxyError::Timeout(_))
    }
}

/// Result alias used across the proxy core
pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

/// SOCKS5 specific errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Method selection request carried no methods
    #[error("No authentication methods offered")]
    NoMethods,

    /// Invalid username/password sub-negotiation version
    #[error("Invalid auth version: {0}")]
    InvalidAuthVersion(u8),

    /// Authentication failed
    #[error("Authentication failed for user: {0}")]
    AuthFailed(String),

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks5ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
}

impl From<Socks5ReplyCode> for u8 {
    fn from(code: Socks5ReplyCode) -> Self {
        code as u8
    }
}

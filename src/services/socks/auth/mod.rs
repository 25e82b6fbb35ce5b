//! SOCKS5 authentication module
//!
//! Method negotiation and RFC 1929 username/password frames.

mod password;

pub use password::{build_auth_result, parse_password_request, PasswordRequest};

use super::consts::*;
use crate::error::{ProxyResult, Socks5Error};

/// Authentication method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication required
    None,
    /// Username/password authentication
    Password,
}

impl AuthMethod {
    /// Convert to SOCKS5 method byte
    pub fn to_byte(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// The method this server insists on. The client's offered list is not
    /// consulted: a client that cannot do the selected method will fail the
    /// next stage.
    pub fn select(auth_enabled: bool) -> Self {
        if auth_enabled {
            AuthMethod::Password
        } else {
            AuthMethod::None
        }
    }
}

/// Parse a version identifier/method selection message
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
///
/// Returns the offered methods and the number of bytes consumed, or `None`
/// if the frame is not complete yet.
pub fn parse_method_selection(buf: &[u8]) -> ProxyResult<Option<(Vec<u8>, usize)>> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let version = buf[0];
    let num_methods = buf[1] as usize;

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version).into());
    }

    if num_methods == 0 {
        return Err(Socks5Error::NoMethods.into());
    }

    if buf.len() < 2 + num_methods {
        return Ok(None);
    }

    Ok(Some((buf[2..2 + num_methods].to_vec(), 2 + num_methods)))
}

/// Build the method selection reply
pub fn build_method_reply(method: AuthMethod) -> [u8; 2] {
    [SOCKS5_VERSION, method.to_byte()]
}

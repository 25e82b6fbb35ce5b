//! Username/password authentication frames
//!
//! Implements RFC 1929 username/password sub-negotiation parsing.

use crate::error::{ProxyResult, Socks5Error};
use crate::services::socks::consts::SOCKS5_AUTH_VERSION;

/// A decoded username/password request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRequest {
    /// Username as sent by the client
    pub username: String,
    /// Password as sent by the client
    pub password: String,
}

/// Parse a username/password request
///
/// # Protocol
///
/// Client sends:
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
/// +----+------+----------+------+----------+
/// ```
///
/// Returns `None` until the whole frame is buffered. Non UTF-8 credentials are
/// decoded lossily; they can never match a configured entry anyway.
pub fn parse_password_request(buf: &[u8]) -> ProxyResult<Option<(PasswordRequest, usize)>> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let version = buf[0];
    if version != SOCKS5_AUTH_VERSION {
        return Err(Socks5Error::InvalidAuthVersion(version).into());
    }

    let username_len = buf[1] as usize;
    if buf.len() < 2 + username_len + 1 {
        return Ok(None);
    }
    let username = String::from_utf8_lossy(&buf[2..2 + username_len]).into_owned();

    let password_len = buf[2 + username_len] as usize;
    let total = 2 + username_len + 1 + password_len;
    if buf.len() < total {
        return Ok(None);
    }
    let password = String::from_utf8_lossy(&buf[3 + username_len..total]).into_owned();

    Ok(Some((PasswordRequest { username, password }, total)))
}

/// Build the sub-negotiation reply
///
/// ```text
/// +----+--------+
/// |VER | STATUS |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
pub fn build_auth_result(status: u8) -> [u8; 2] {
    [SOCKS5_AUTH_VERSION, status]
}

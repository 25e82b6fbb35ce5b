//! SOCKS5 command parser
//!
//! Parses SOCKS5 command requests out of the handshake buffer.

use crate::error::{ProxyError, ProxyResult, Socks5Error};
use crate::services::socks::consts::*;
use crate::services::socks::types::{SocksCommand, TargetAddr};
use bytes::Buf;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// A fully decoded CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Requested command (always CONNECT once parsed successfully)
    pub command: SocksCommand,
    /// Destination address
    pub target: TargetAddr,
}

impl CommandRequest {
    /// Address type byte as sent by the client
    pub fn addr_type(&self) -> u8 {
        self.target.addr_type()
    }
}

/// Parse a SOCKS5 command request
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Returns `None` until the whole request is buffered. Commands other than
/// CONNECT and unknown address types are reported as
/// [`ProxyError::Unsupported`] rather than answered.
pub fn parse_command(buf: &[u8]) -> ProxyResult<Option<(CommandRequest, usize)>> {
    if buf.len() < 4 {
        return Ok(None);
    }

    let version = buf[0];
    let cmd_byte = buf[1];
    let addr_type = buf[3];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version).into());
    }

    match SocksCommand::from_byte(cmd_byte) {
        Some(SocksCommand::Connect) => {}
        Some(other) => {
            return Err(ProxyError::Unsupported(format!("SOCKS5 {} command", other)));
        }
        None => {
            return Err(ProxyError::Unsupported(
                Socks5Error::CommandNotSupported(cmd_byte).to_string(),
            ));
        }
    }

    let Some((target, addr_len)) = parse_address(&buf[4..], addr_type)? else {
        return Ok(None);
    };

    debug!("Parsed SOCKS5 command: CONNECT to {}", target);

    Ok(Some((
        CommandRequest {
            command: SocksCommand::Connect,
            target,
        },
        4 + addr_len,
    )))
}

/// Parse the address portion of a SOCKS5 request
fn parse_address(mut buf: &[u8], addr_type: u8) -> ProxyResult<Option<(TargetAddr, usize)>> {
    match addr_type {
        SOCKS5_ADDR_TYPE_IPV4 => {
            if buf.len() < 6 {
                return Ok(None);
            }
            let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
            buf.advance(4);
            let port = buf.get_u16();
            Ok(Some((TargetAddr::ipv4(ip, port), 6)))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            if buf.is_empty() {
                return Ok(None);
            }
            let domain_len = buf[0] as usize;
            if domain_len == 0 || domain_len > MAX_DOMAIN_LEN {
                return Err(Socks5Error::InvalidDomain(format!("length {}", domain_len)).into());
            }
            if buf.len() < 1 + domain_len + 2 {
                return Ok(None);
            }
            let domain = String::from_utf8(buf[1..1 + domain_len].to_vec())
                .map_err(|_| Socks5Error::InvalidDomain("invalid UTF-8".to_string()))?;
            buf.advance(1 + domain_len);
            let port = buf.get_u16();
            Ok(Some((TargetAddr::domain(domain, port), 1 + domain_len + 2)))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            if buf.len() < 18 {
                return Ok(None);
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[..16]);
            buf.advance(16);
            let port = buf.get_u16();
            Ok(Some((TargetAddr::ipv6(Ipv6Addr::from(octets), port), 18)))
        }

        _ => Err(ProxyError::Unsupported(
            Socks5Error::AddressTypeNotSupported(addr_type).to_string(),
        )),
    }
}

//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::Socks5ReplyCode;
use crate::services::socks::consts::*;

/// Build a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// The reply echoes the request's address type. The bound address is not
/// meaningful behind a chained proxy, so it is all zeroes of that type
/// (an empty name for domain requests).
pub fn build_reply(reply_code: u8, addr_type: u8) -> Vec<u8> {
    let mut reply = vec![SOCKS5_VERSION, reply_code, SOCKS5_RESERVED, addr_type];

    match addr_type {
        SOCKS5_ADDR_TYPE_IPV6 => reply.extend_from_slice(&[0u8; 16]),
        SOCKS5_ADDR_TYPE_DOMAIN => reply.push(0),
        _ => {
            reply[3] = SOCKS5_ADDR_TYPE_IPV4;
            reply.extend_from_slice(&[0u8; 4]);
        }
    }
    reply.extend_from_slice(&0u16.to_be_bytes());

    reply
}

/// Build a success reply
pub fn build_success(addr_type: u8) -> Vec<u8> {
    build_reply(Socks5ReplyCode::Succeeded.into(), addr_type)
}

/// Build a failure reply
pub fn build_failure(addr_type: u8) -> Vec<u8> {
    build_reply(Socks5ReplyCode::GeneralFailure.into(), addr_type)
}

//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 commands and building replies.

mod parser;
mod reply;

pub use parser::{parse_command, CommandRequest};
pub use reply::{build_failure, build_reply, build_success};

//! SOCKS5 server handshake state machine
//!
//! The handshake is driven without touching I/O: the session feeds whatever
//! bytes the client sent and asks the machine what to do next. Each stage
//! only ever parses its own frame; once a stage completes the machine never
//! routes bytes through that parser again.
//!
//! ```text
//! AwaitingInitial -> [AwaitingAuth] -> AwaitingCommand -> Relaying
//!        \                 \                 \
//!         +-----------------+-----------------+--> Closed
//! ```

use super::auth::{
    build_auth_result, build_method_reply, parse_method_selection, parse_password_request,
    AuthMethod,
};
use super::command::{build_failure, build_success, parse_command};
use super::consts::*;
use super::types::TargetAddr;
use crate::credentials::CredentialStore;
use crate::error::{ProxyError, ProxyResult, Socks5Error};
use bytes::{Buf, Bytes, BytesMut};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handshake stage of one SOCKS5 connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the version identifier/method selection message
    AwaitingInitial,
    /// Waiting for the username/password request
    AwaitingAuth,
    /// Waiting for the command request, or for the dial it triggered
    AwaitingCommand,
    /// Handshake over, bytes are opaque payload
    Relaying,
    /// Connection is being torn down
    Closed,
}

/// What the session must do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Read more bytes from the client
    NeedMore,
    /// Write this reply and keep driving the machine
    Reply(Bytes),
    /// Write this reply, flush, then close the connection
    Reject(Bytes),
    /// Dial the target, then report back with
    /// [`Socks5Handshake::connect_succeeded`] or
    /// [`Socks5Handshake::connect_failed`]
    Connect(TargetAddr),
}

/// Per-connection SOCKS5 handshake
#[derive(Debug)]
pub struct Socks5Handshake {
    state: HandshakeState,
    auth_enabled: bool,
    credentials: Arc<CredentialStore>,
    buf: BytesMut,
    auth_method: Option<AuthMethod>,
    username: Option<String>,
    target: Option<TargetAddr>,
    dialing: bool,
}

impl Socks5Handshake {
    /// Create a handshake in the [`HandshakeState::AwaitingInitial`] stage
    pub fn new(auth_enabled: bool, credentials: Arc<CredentialStore>) -> Self {
        Socks5Handshake {
            state: HandshakeState::AwaitingInitial,
            auth_enabled,
            credentials,
            buf: BytesMut::new(),
            auth_method: None,
            username: None,
            target: None,
            dialing: false,
        }
    }

    /// Current stage
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Method chosen during negotiation
    pub fn auth_method(&self) -> Option<AuthMethod> {
        self.auth_method
    }

    /// Authenticated username, when password auth was used
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Destination requested by the client, once parsed
    pub fn target(&self) -> Option<&TargetAddr> {
        self.target.as_ref()
    }

    /// Append bytes received from the client
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered past the last parsed frame.
    ///
    /// After a successful CONNECT these are early payload for the destination.
    pub fn take_remaining(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Advance the machine as far as the buffered bytes allow.
    ///
    /// Errors are fatal to the connection and move the machine to
    /// [`HandshakeState::Closed`]: malformed frames come back as protocol
    /// errors, CONNECT-less commands as [`ProxyError::Unsupported`].
    pub fn advance(&mut self) -> ProxyResult<HandshakeAction> {
        let result = match self.state {
            HandshakeState::AwaitingInitial => self.on_initial(),
            HandshakeState::AwaitingAuth => self.on_auth(),
            HandshakeState::AwaitingCommand => self.on_command(),
            HandshakeState::Relaying | HandshakeState::Closed => Err(ProxyError::Parse(format!(
                "SOCKS5 handshake already finished ({:?})",
                self.state
            ))),
        };

        if result.is_err() {
            self.state = HandshakeState::Closed;
        }
        result
    }

    /// The dial for the pending CONNECT succeeded; returns the success reply
    pub fn connect_succeeded(&mut self) -> Bytes {
        let addr_type = self.pending_addr_type();
        self.dialing = false;
        self.state = HandshakeState::Relaying;
        Bytes::from(build_success(addr_type))
    }

    /// The dial for the pending CONNECT failed; returns the failure reply
    pub fn connect_failed(&mut self) -> Bytes {
        let addr_type = self.pending_addr_type();
        self.dialing = false;
        self.state = HandshakeState::Closed;
        Bytes::from(build_failure(addr_type))
    }

    fn pending_addr_type(&self) -> u8 {
        self.target
            .as_ref()
            .map(|t| t.addr_type())
            .unwrap_or(SOCKS5_ADDR_TYPE_IPV4)
    }

    fn on_initial(&mut self) -> ProxyResult<HandshakeAction> {
        let Some((methods, consumed)) = parse_method_selection(&self.buf)? else {
            return Ok(HandshakeAction::NeedMore);
        };
        self.buf.advance(consumed);

        let method = AuthMethod::select(self.auth_enabled);
        debug!(
            "SOCKS5 client offered methods {:?}, selected {:?}",
            methods, method
        );

        self.auth_method = Some(method);
        self.state = match method {
            AuthMethod::Password => HandshakeState::AwaitingAuth,
            AuthMethod::None => HandshakeState::AwaitingCommand,
        };

        Ok(HandshakeAction::Reply(Bytes::copy_from_slice(
            &build_method_reply(method),
        )))
    }

    fn on_auth(&mut self) -> ProxyResult<HandshakeAction> {
        let parsed = match parse_password_request(&self.buf) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Malformed SOCKS5 auth request: {}", e);
                return Ok(self.reject_auth());
            }
        };
        let Some((request, consumed)) = parsed else {
            return Ok(HandshakeAction::NeedMore);
        };
        self.buf.advance(consumed);

        if self.credentials.verify(&request.username, &request.password) {
            debug!("Authentication successful for user: {}", request.username);
            self.username = Some(request.username);
            self.state = HandshakeState::AwaitingCommand;
            Ok(HandshakeAction::Reply(Bytes::copy_from_slice(
                &build_auth_result(SOCKS5_AUTH_STATUS_SUCCESS),
            )))
        } else {
            warn!("{}", Socks5Error::AuthFailed(request.username));
            Ok(self.reject_auth())
        }
    }

    fn reject_auth(&mut self) -> HandshakeAction {
        self.state = HandshakeState::Closed;
        self.buf.clear();
        HandshakeAction::Reject(Bytes::copy_from_slice(&build_auth_result(
            SOCKS5_AUTH_STATUS_FAILURE,
        )))
    }

    fn on_command(&mut self) -> ProxyResult<HandshakeAction> {
        if self.dialing {
            return Ok(HandshakeAction::NeedMore);
        }

        let Some((request, consumed)) = parse_command(&self.buf)? else {
            return Ok(HandshakeAction::NeedMore);
        };
        self.buf.advance(consumed);

        self.dialing = true;
        self.target = Some(request.target.clone());
        Ok(HandshakeAction::Connect(request.target))
    }
}

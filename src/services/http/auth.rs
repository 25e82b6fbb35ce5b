//! `Proxy-Authorization: Basic` handling

use super::head::HttpRequestHead;
use crate::credentials::CredentialStore;
use crate::error::{ProxyError, ProxyResult};
use base64::{engine::general_purpose, Engine as _};

/// Header carrying the client's proxy credentials
pub const PROXY_AUTHORIZATION: &str = "proxy-authorization";

/// Username and password decoded from a Basic credential
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredential {
    /// Decode `Basic <base64(username:password)>`.
    ///
    /// The scheme prefix is optional. The decoded text is split on the first
    /// `:` so passwords may themselves contain colons.
    pub fn decode(value: &str) -> ProxyResult<Self> {
        let value = value.trim();
        let encoded = match value.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
            Some((scheme, _)) => {
                return Err(ProxyError::Auth(format!(
                    "unsupported authorization scheme '{}'",
                    scheme
                )))
            }
            None => value,
        };

        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ProxyError::Auth(format!("invalid base64 credential: {}", e)))?;
        let text = String::from_utf8(decoded)
            .map_err(|_| ProxyError::Auth("credential is not valid UTF-8".to_string()))?;
        let (username, password) = text
            .split_once(':')
            .ok_or_else(|| ProxyError::Auth("credential has no ':' separator".to_string()))?;

        Ok(BasicCredential {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Check a parsed head's proxy credentials; returns the authenticated username
pub fn authorize(head: &HttpRequestHead, credentials: &CredentialStore) -> ProxyResult<String> {
    let value = head
        .header(PROXY_AUTHORIZATION)
        .ok_or_else(|| ProxyError::Auth("missing Proxy-Authorization header".to_string()))?;
    let credential = BasicCredential::decode(value)?;

    if credentials.verify(&credential.username, &credential.password) {
        Ok(credential.username)
    } else {
        Err(ProxyError::Auth(format!(
            "invalid credentials for user: {}",
            credential.username
        )))
    }
}

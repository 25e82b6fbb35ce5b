//! Credential lookup shared by the HTTP and SOCKS5 listeners.

use crate::config::Config;
use std::collections::HashMap;

/// Read-only username to password table
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    /// Build the store from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        CredentialStore {
            users: config.auth.clone(),
        }
    }

    /// Check a username/password pair. Comparison is exact and case-sensitive.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|expected| expected == password)
            .unwrap_or(false)
    }

    /// Number of configured users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are configured
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<(String, String)> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        CredentialStore {
            users: iter.into_iter().collect(),
        }
    }
}

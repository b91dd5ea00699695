//! Credentials used to reach the directory.
//!
//! Secrets are held in [`secrecy`] wrappers so they never show up in `Debug` output or
//! logs; callers expose them only at the point of use.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Service account used to bind to the directory.
#[derive(Debug)]
pub struct ServiceAccount {
    /// Account name, without domain
    pub account_id: String,

    /// Account password
    password: SecretString,
}

impl ServiceAccount {
    /// Create new service account credentials.
    ///
    /// # Arguments
    ///
    /// * `account_id` - The account's logon name
    /// * `password` - The account password
    #[must_use]
    pub fn new(account_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Bind identity in user-principal form (`account@domain`).
    #[must_use]
    pub fn principal(&self, domain: &str) -> String {
        format!("{}@{}", self.account_id, domain)
    }

    /// Get the bind password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Pre-encoded HTTP basic credentials for the directory API.
pub struct BasicAuth(SecretString);

impl BasicAuth {
    /// Wrap an already base64-encoded `user:password` token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.0.expose_secret())
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BasicAuth([REDACTED])")
    }
}

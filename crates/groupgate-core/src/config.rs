//! Configuration for the directory API transport and environment lookup helpers.
//!
//! Configuration is read once at startup into explicit structs that are passed to the
//! searchers; nothing reads the environment afterwards.

use crate::client::API_DEFAULT_TIMEOUT;
use crate::credentials::BasicAuth;
use crate::directory::DEFAULT_API_BASE_DN;
use crate::Error;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// PEM CA bundle trusted for outbound TLS.
pub const ENV_CA_BUNDLE_PATH: &str = "CA_BUNDLE_PATH";
/// Directory API endpoint.
pub const ENV_API_URL: &str = "LDAP_API_URL";
/// Pre-encoded basic-auth token for the directory API.
pub const ENV_API_BASIC_AUTH: &str = "LDAP_API_BASIC_AUTH";
/// Search base DN sent to the directory API.
pub const ENV_API_BASE_DN: &str = "LDAP_API_BASE_DN";
/// Directory transport selection.
pub const ENV_BACKEND: &str = "DIRECTORY_BACKEND";
/// Comma-separated accepted groups.
pub const ENV_ACCEPTED_GROUPS: &str = "ACCEPTED_GROUPS";

/// Source of configuration values, keyed by variable name.
pub trait EnvSource {
    /// Returns the value of `key`, treating empty values as unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the value of `key` or a [`Error::ConfigError`] naming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    fn required(&self, key: &str) -> Result<String, Error> {
        self.get(key)
            .ok_or_else(|| Error::ConfigError(format!("missing required variable `{key}`")))
    }
}

/// Reads configuration from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.trim().is_empty())
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key).filter(|value| !value.trim().is_empty())
    }
}

/// Configuration for the HTTP API that fronts the directory.
#[derive(Debug, Validate)]
pub struct ApiConfig {
    /// Search endpoint URL
    #[validate(url)]
    pub url: String,

    /// Basic-auth credentials
    pub basic_auth: BasicAuth,

    /// Search base DN
    #[validate(length(min = 1))]
    pub base_dn: String,

    /// Optional path to a PEM CA bundle
    pub tls_ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Create a new API configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `url` - The search endpoint (e.g., "https://ldap-api.example.com/search")
    /// * `basic_auth` - The basic-auth credentials
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if the URL is invalid.
    pub fn new(url: impl Into<String>, basic_auth: BasicAuth) -> Result<Self, Error> {
        let config = Self {
            url: url.into(),
            basic_auth,
            base_dn: DEFAULT_API_BASE_DN.to_string(),
            tls_ca_cert: None,
            request_timeout_secs: API_DEFAULT_TIMEOUT,
        };

        config.validate()?;

        Ok(config)
    }

    /// Build the configuration from environment variables.
    ///
    /// `LDAP_API_URL` and `LDAP_API_BASIC_AUTH` are required; `LDAP_API_BASE_DN` and
    /// `CA_BUNDLE_PATH` are optional.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first missing or invalid variable.
    pub fn from_env(env: &impl EnvSource) -> Result<Self, Error> {
        let url = env.required(ENV_API_URL)?;
        let auth = env.required(ENV_API_BASIC_AUTH)?;
        let mut config = Self::new(url, BasicAuth::new(auth))?;

        if let Some(base_dn) = env.get(ENV_API_BASE_DN) {
            config = config.with_base_dn(base_dn);
        }
        if let Some(path) = env.get(ENV_CA_BUNDLE_PATH) {
            config = config.with_ca_cert(PathBuf::from(path));
        }
        Ok(config)
    }

    /// Set the search base DN.
    #[must_use]
    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = base_dn.into();
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and validate the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_url(&self) -> Result<Url, Error> {
        Url::parse(&self.url).map_err(|e| Error::ConfigError(format!("Invalid API URL: {e}")))
    }
}

//! HTTP client settings for the directory API.
//!
//! Requests are never retried: any failure is reported to the caller immediately.

use crate::error::{Error, Result};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default overall timeout for directory API requests (seconds)
pub const API_DEFAULT_TIMEOUT: u64 = 10;

/// Default TCP connect timeout for directory API requests (seconds)
pub const API_CONNECT_TIMEOUT: u64 = 10;

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Overall request timeout
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Enable request/response logging
    pub enable_logging: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(API_DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(API_CONNECT_TIMEOUT),
            enable_logging: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Load every certificate from a PEM CA bundle.
///
/// # Errors
///
/// Returns [`Error::ConfigError`] if the file cannot be read or holds no valid certificate.
pub fn load_ca_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>> {
    debug!("loading CA bundle from {}", path.display());
    let pem = std::fs::read(path).map_err(|err| {
        Error::ConfigError(format!(
            "Failed to read CA bundle {}: {err}",
            path.display()
        ))
    })?;
    let certificates = reqwest::Certificate::from_pem_bundle(&pem)
        .map_err(|err| Error::ConfigError(format!("Invalid CA bundle: {err}")))?;
    if certificates.is_empty() {
        return Err(Error::ConfigError(format!(
            "CA bundle {} contains no certificates",
            path.display()
        )));
    }
    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.enable_logging);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(3))
            .with_connect_timeout(Duration::from_secs(1))
            .with_logging(false);

        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert!(!config.enable_logging);
    }

    #[test]
    fn test_missing_ca_bundle() {
        let err = load_ca_bundle(&PathBuf::from("/nonexistent/ca-bundle.pem")).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_ca_bundle_without_certificates() {
        let path = std::env::temp_dir().join(format!(
            "groupgate-empty-bundle-{}.pem",
            std::process::id()
        ));
        std::fs::write(&path, b"not a certificate\n").unwrap();
        let result = load_ca_bundle(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}

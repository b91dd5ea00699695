//! Configuration types for direct LDAP access.

use crate::{dn::DistinguishedName, Result};
use groupgate_core::config::EnvSource;
use groupgate_core::credentials::ServiceAccount;
use groupgate_core::Error;
use std::time::Duration;
use url::Url;

/// Standard (plain) LDAP port.
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Directory host name.
pub const ENV_SERVER_NAME: &str = "LDAP_SERVER_NAME";
/// Base domain, e.g. `example.com`.
pub const ENV_DOMAIN: &str = "LDAP_DOMAIN";
/// Service account logon name.
pub const ENV_SERVICE_ACCOUNT_ID: &str = "SERVICE_ACCOUNT_ID";
/// Service account password.
pub const ENV_SERVICE_ACCOUNT_PASS: &str = "SERVICE_ACCOUNT_PASS";

/// Configuration for connecting to the directory over LDAP.
#[derive(Debug)]
pub struct LdapConfig {
    url: String,
    domain: String,
    base_dn: DistinguishedName,
    account: ServiceAccount,
    connection_timeout_secs: Option<u64>,
    operation_timeout_secs: Option<u64>,
}

impl LdapConfig {
    /// Creates a configuration for `server` on the standard port.
    ///
    /// The search base is derived from `domain` (`example.com` → `DC=example,DC=com`).
    ///
    /// # Errors
    ///
    /// Returns an error if the server name does not form a valid URL or the domain is empty.
    pub fn new(
        server: impl AsRef<str>,
        domain: impl Into<String>,
        account: ServiceAccount,
    ) -> Result<Self> {
        let url = format!("ldap://{}:{DEFAULT_LDAP_PORT}", server.as_ref().trim());
        let parsed = Url::parse(&url)?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(Error::ConfigError(format!("invalid LDAP server name `{url}`")));
        }

        let domain = domain.into();
        let base_dn = DistinguishedName::from_domain(&domain)?;

        Ok(Self {
            url,
            domain,
            base_dn,
            account,
            connection_timeout_secs: None,
            operation_timeout_secs: None,
        })
    }

    /// Builds the configuration from environment variables.
    ///
    /// `LDAP_SERVER_NAME`, `LDAP_DOMAIN`, `SERVICE_ACCOUNT_ID` and `SERVICE_ACCOUNT_PASS`
    /// are all required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first missing variable.
    pub fn from_env(env: &impl EnvSource) -> Result<Self> {
        let server = env.required(ENV_SERVER_NAME)?;
        let domain = env.required(ENV_DOMAIN)?;
        let account = ServiceAccount::new(
            env.required(ENV_SERVICE_ACCOUNT_ID)?,
            env.required(ENV_SERVICE_ACCOUNT_PASS)?,
        );
        Self::new(server, domain, account)
    }

    /// Returns the LDAP endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the base domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the search base distinguished name.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Returns the service account.
    #[must_use]
    pub const fn account(&self) -> &ServiceAccount {
        &self.account
    }

    /// Identity used for the simple bind.
    #[must_use]
    pub fn bind_identity(&self) -> String {
        self.account.principal(&self.domain)
    }

    /// Returns the connection timeout, if one is set.
    #[must_use]
    pub fn connection_timeout(&self) -> Option<Duration> {
        self.connection_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the per-operation timeout, if one is set.
    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }

    /// Overrides the endpoint port.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL is invalid.
    pub fn with_port(mut self, port: u16) -> Result<Self> {
        let mut url = Url::parse(&self.url)?;
        url.set_port(Some(port))
            .map_err(|()| Error::ConfigError(format!("cannot set port on `{}`", self.url)))?;
        self.url = url.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Sets a connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = Some(seconds);
        self
    }

    /// Sets a per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = Some(seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_account() -> ServiceAccount {
        ServiceAccount::new("svc-groups", "secret")
    }

    #[test]
    fn derives_url_base_dn_and_identity() {
        let config = LdapConfig::new("dc01.example.com", "example.com", sample_account()).unwrap();

        assert_eq!(config.url(), "ldap://dc01.example.com:389");
        assert_eq!(config.base_dn().as_str(), "DC=example,DC=com");
        assert_eq!(config.bind_identity(), "svc-groups@example.com");
        assert!(config.connection_timeout().is_none());
        assert!(config.operation_timeout().is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = LdapConfig::new("dc01.example.com", "corp.example.com", sample_account())
            .unwrap()
            .with_port(3268)
            .unwrap()
            .with_connection_timeout_secs(5)
            .with_operation_timeout_secs(30);

        assert_eq!(config.url(), "ldap://dc01.example.com:3268");
        assert_eq!(config.base_dn().as_str(), "DC=corp,DC=example,DC=com");
        assert_eq!(config.connection_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.operation_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_empty_domain() {
        let result = LdapConfig::new("dc01.example.com", "", sample_account());
        assert!(result.is_err());
    }

    #[test]
    fn from_env_requires_every_variable() {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVER_NAME, "dc01.example.com"),
            (ENV_DOMAIN, "example.com"),
            (ENV_SERVICE_ACCOUNT_ID, "svc-groups"),
            (ENV_SERVICE_ACCOUNT_PASS, "secret"),
        ]);

        let config = LdapConfig::from_env(&|key: &str| vars.get(key).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.account().password(), "secret");
        assert_eq!(config.domain(), "example.com");

        vars.remove(ENV_SERVICE_ACCOUNT_PASS);
        let err = LdapConfig::from_env(&|key: &str| vars.get(key).map(|v| (*v).to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ConfigError("missing required variable `SERVICE_ACCOUNT_PASS`".to_string())
        );
    }
}

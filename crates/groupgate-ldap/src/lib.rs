//! Direct LDAP transport for groupgate.
//!
//! [`LdapSearcher`] binds to the directory with a service account and searches for a
//! subject's entry. It implements [`groupgate_core::DirectorySearcher`], so it plugs
//! straight into a [`groupgate_core::GroupResolver`].

#![deny(missing_docs)]

mod client;
mod config;
mod dn;

pub use client::{LdapEntry, LdapSearcher};
pub use config::{
    LdapConfig, DEFAULT_LDAP_PORT, ENV_DOMAIN, ENV_SERVER_NAME, ENV_SERVICE_ACCOUNT_ID,
    ENV_SERVICE_ACCOUNT_PASS,
};
pub use dn::{DistinguishedName, DistinguishedNameError};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = groupgate_core::Result<T>;

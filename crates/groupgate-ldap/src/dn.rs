//! Distinguished Name utilities for search bases.

use std::fmt;
use thiserror::Error;

use groupgate_core::error::Error as CoreError;

/// Errors that can occur when building distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// A DNS domain could not be turned into domain components.
    #[error("invalid directory domain `{0}`")]
    InvalidDomain(String),
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Distinguished name used as a search base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    raw: String,
}

impl DistinguishedName {
    /// Builds the domain-component DN for a DNS domain.
    ///
    /// `example.com` becomes `DC=example,DC=com`.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError::InvalidDomain`] for empty domains or empty labels.
    pub fn from_domain(domain: &str) -> std::result::Result<Self, DistinguishedNameError> {
        let domain = domain.trim().trim_end_matches('.');
        if domain.is_empty() || domain.split('.').any(str::is_empty) {
            return Err(DistinguishedNameError::InvalidDomain(domain.to_string()));
        }

        let raw = domain
            .split('.')
            .map(|label| format!("DC={}", escape(label)))
            .collect::<Vec<_>>()
            .join(",");
        Ok(Self { raw })
    }

    /// Borrows the distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn escape(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx == last && ch == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

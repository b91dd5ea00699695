//! Directory records, search filters and the searcher capability.
//!
//! Both transports describe the same search: a subject's account name plus a fixed
//! attribute set. [`SearchFilter`] builds the filter expression for each transport and
//! [`DirectorySearcher`] is the seam the resolver talks to.

use crate::error::{StatusResult, NO_TRANSPORT_STATUS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attributes requested from the directory for every search.
pub const SEARCH_ATTRIBUTES: &[&str] = &["dn", "cn", "sAMAccountName", "mail", "memberOf"];

/// Base DN sent to the directory API unless configured otherwise.
pub const DEFAULT_API_BASE_DN: &str = "DC=a,DC=com";

const DIRECT_FILTER_TEMPLATE: &str = "(&(objectClass=user)(sAMAccountName={subject}))";
const API_FILTER_TEMPLATE: &str = "(&(objectClass=person)(objectClass=user)(userAccountControl=512)(sAMAccountName={subject})(!(objectClass=computer)))";

/// One directory entry returned for a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Distinguished name of the entry.
    #[serde(default)]
    pub dn: String,
    /// Common name.
    #[serde(default)]
    pub cn: String,
    /// Logon name (`sAMAccountName`).
    #[serde(default, rename = "sAMAccountName")]
    pub account_name: String,
    /// Email address.
    #[serde(default)]
    pub mail: String,
    /// Controls echoed back by the directory API.
    #[serde(default)]
    pub controls: Vec<String>,
    /// Raw group memberships as distinguished names, in directory order.
    #[serde(default, rename = "memberOf")]
    pub member_of: Vec<String>,
}

impl DirectoryRecord {
    /// Creates a record with the given DN and group memberships.
    #[must_use]
    pub fn new<I, S>(dn: impl Into<String>, member_of: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dn: dn.into(),
            member_of: member_of.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Search request descriptor shared by both transports.
///
/// Serializes to the directory API body `{filter, attributes, sizeLimit, dn}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    filter: String,
    attributes: Vec<String>,
    size_limit: i32,
    #[serde(skip)]
    time_limit: i32,
    #[serde(rename = "dn")]
    base_dn: String,
}

impl SearchFilter {
    /// Filter used when searching the directory over LDAP.
    #[must_use]
    pub fn direct(subject_id: &str, base_dn: impl Into<String>) -> Self {
        Self::from_template(DIRECT_FILTER_TEMPLATE, subject_id, base_dn.into())
    }

    /// Filter used when searching through the directory API.
    ///
    /// Only enabled (`userAccountControl=512`) person accounts match; computer objects are
    /// excluded.
    #[must_use]
    pub fn api(subject_id: &str, base_dn: impl Into<String>) -> Self {
        Self::from_template(API_FILTER_TEMPLATE, subject_id, base_dn.into())
    }

    fn from_template(template: &str, subject_id: &str, base_dn: String) -> Self {
        Self {
            filter: template.replace("{subject}", &escape_filter_value(subject_id)),
            attributes: SEARCH_ATTRIBUTES.iter().map(|a| (*a).to_string()).collect(),
            size_limit: 0,
            time_limit: 0,
            base_dn,
        }
    }

    /// The LDAP filter expression.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Requested attribute names.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Maximum number of entries (0 means unlimited).
    #[must_use]
    pub const fn size_limit(&self) -> i32 {
        self.size_limit
    }

    /// Server-side time limit in seconds (0 means unlimited).
    #[must_use]
    pub const fn time_limit(&self) -> i32 {
        self.time_limit
    }

    /// Search base distinguished name.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }
}

/// Records returned by one search, with the transport status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// Matching records in directory order.
    pub records: Vec<DirectoryRecord>,
    /// HTTP status on the API path, `0` over LDAP.
    pub status: u16,
}

impl SearchResponse {
    /// Creates a response.
    #[must_use]
    pub const fn new(records: Vec<DirectoryRecord>, status: u16) -> Self {
        Self { records, status }
    }

    /// Creates a response for a transport without status codes.
    #[must_use]
    pub const fn without_status(records: Vec<DirectoryRecord>) -> Self {
        Self::new(records, NO_TRANSPORT_STATUS)
    }
}

/// Available directory transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Bind and search over the directory protocol.
    Ldap,
    /// Search through the HTTP API that fronts the directory.
    Api,
}

impl Backend {
    /// Returns the backend name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ldap => "ldap",
            Self::Api => "api",
        }
    }
}

impl FromStr for Backend {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ldap" => Ok(Self::Ldap),
            "api" => Ok(Self::Api),
            _ => Err(crate::Error::ConfigError(format!(
                "Unknown directory backend: {s}"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability to look up a subject in the directory.
///
/// Implementations own their connections: each call opens, uses and closes whatever
/// transport resources it needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySearcher: Send + Sync {
    /// Which transport this searcher uses.
    fn backend(&self) -> Backend;

    /// Search for the subject's directory entries.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::StatusError`] on connection, bind, HTTP or decode failures.
    async fn search(&self, subject_id: &str) -> StatusResult<SearchResponse>;

    /// Check that the directory is reachable, returning the transport status.
    ///
    /// # Errors
    ///
    /// Returns the failure of the underlying search.
    async fn ping(&self) -> StatusResult<u16> {
        self.search("").await.map(|response| response.status)
    }
}

/// Escapes a value for use inside an LDAP filter (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_filter_shape() {
        let filter = SearchFilter::direct("jdoe", "DC=example,DC=com");
        assert_eq!(
            filter.filter(),
            "(&(objectClass=user)(sAMAccountName=jdoe))"
        );
        assert_eq!(filter.base_dn(), "DC=example,DC=com");
        assert_eq!(filter.size_limit(), 0);
        assert_eq!(filter.time_limit(), 0);
        assert_eq!(
            filter.attributes(),
            &["dn", "cn", "sAMAccountName", "mail", "memberOf"]
        );
    }

    #[test]
    fn api_filter_serializes_to_request_body() {
        let filter = SearchFilter::api("jdoe", DEFAULT_API_BASE_DN);
        let body = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            body,
            json!({
                "filter": "(&(objectClass=person)(objectClass=user)(userAccountControl=512)(sAMAccountName=jdoe)(!(objectClass=computer)))",
                "attributes": ["dn", "cn", "sAMAccountName", "mail", "memberOf"],
                "sizeLimit": 0,
                "dn": "DC=a,DC=com"
            })
        );
    }

    #[test]
    fn empty_subject_leaves_value_empty() {
        let filter = SearchFilter::direct("", "DC=example,DC=com");
        assert_eq!(filter.filter(), "(&(objectClass=user)(sAMAccountName=))");
    }

    #[test]
    fn subject_is_escaped() {
        let filter = SearchFilter::direct("*)(cn=*", "DC=example,DC=com");
        assert_eq!(
            filter.filter(),
            "(&(objectClass=user)(sAMAccountName=\\2a\\29\\28cn=\\2a))"
        );
        assert_eq!(escape_filter_value("a\\b\0"), "a\\5cb\\00");
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: DirectoryRecord = serde_json::from_value(json!({
            "dn": "CN=John Doe,OU=People,DC=a,DC=com",
            "memberOf": ["CN=GroupA,OU=Groups,DC=a,DC=com"]
        }))
        .unwrap();

        assert_eq!(record.dn, "CN=John Doe,OU=People,DC=a,DC=com");
        assert!(record.cn.is_empty());
        assert!(record.controls.is_empty());
        assert_eq!(record.member_of, vec!["CN=GroupA,OU=Groups,DC=a,DC=com"]);
    }

    #[test]
    fn backend_from_str() {
        assert_eq!("LDAP".parse::<Backend>().unwrap(), Backend::Ldap);
        assert_eq!(" api ".parse::<Backend>().unwrap(), Backend::Api);
        assert!(matches!(
            "smtp".parse::<Backend>(),
            Err(crate::Error::ConfigError(_))
        ));
        assert_eq!(Backend::Ldap.to_string(), "ldap");
    }
}

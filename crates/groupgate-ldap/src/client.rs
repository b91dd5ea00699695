//! Direct LDAP searcher.

use crate::{config::LdapConfig, Result};
use async_trait::async_trait;
use groupgate_core::error::{Error, StatusError, StatusResult, NO_TRANSPORT_STATUS};
use groupgate_core::{Backend, DirectoryRecord, DirectorySearcher, SearchFilter, SearchResponse};
use ldap3::{DerefAliases, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// LDAP entry representation used by the searcher.
#[derive(Debug, Clone, Default)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserved order from server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns all values of the attribute, matching its name case-insensitively.
    #[must_use]
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute).first().map(String::as_str)
    }

    /// Converts the entry into the transport-neutral record.
    #[must_use]
    pub fn into_record(self) -> DirectoryRecord {
        let text = |attribute: &str| self.first(attribute).unwrap_or_default().to_string();
        DirectoryRecord {
            cn: text("cn"),
            account_name: text("sAMAccountName"),
            mail: text("mail"),
            controls: Vec::new(),
            member_of: self.values("memberOf").to_vec(),
            dn: self.dn.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, identity: &str, password: &str) -> Result<()>;
    async fn search(&mut self, request: &SearchFilter) -> Result<Vec<LdapEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Searches the directory by binding with the service account.
///
/// Every search opens its own connection and always unbinds before returning.
pub struct LdapSearcher {
    config: Arc<LdapConfig>,
    connector: Box<dyn LdapConnector>,
}

impl LdapSearcher {
    /// Creates a searcher that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: LdapConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self { config, connector }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: LdapConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// The configuration this searcher was built from.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    async fn open_session(&self) -> StatusResult<Box<dyn LdapSession>> {
        self.connector.connect().await.map_err(|err| {
            warn!(url = %self.config.url(), error = %err, "LDAP connect failed");
            StatusError::from(err)
        })
    }

    async fn bind(&self, session: &mut dyn LdapSession) -> Result<()> {
        session
            .simple_bind(
                &self.config.bind_identity(),
                self.config.account().password(),
            )
            .await
    }

    async fn close(session: &mut dyn LdapSession) {
        if let Err(err) = session.unbind().await {
            warn!(error = %err, "LDAP unbind failed");
        }
    }
}

#[async_trait]
impl DirectorySearcher for LdapSearcher {
    fn backend(&self) -> Backend {
        Backend::Ldap
    }

    async fn search(&self, subject_id: &str) -> StatusResult<SearchResponse> {
        let request = SearchFilter::direct(subject_id, self.config.base_dn().as_str());
        debug!(filter = %request.filter(), base_dn = %request.base_dn(), "LDAP search");

        let mut session = self.open_session().await?;
        let outcome = match self.bind(&mut *session).await {
            Ok(()) => session.search(&request).await,
            Err(err) => Err(err),
        };
        Self::close(&mut *session).await;

        let entries = outcome?;
        debug!(subject = %subject_id, count = entries.len(), "LDAP search complete");
        Ok(SearchResponse::without_status(
            entries.into_iter().map(LdapEntry::into_record).collect(),
        ))
    }

    async fn ping(&self) -> StatusResult<u16> {
        let mut session = self.open_session().await?;
        let outcome = self.bind(&mut *session).await;
        Self::close(&mut *session).await;

        outcome?;
        info!(url = %self.config.url(), "LDAP bind succeeded");
        Ok(NO_TRANSPORT_STATUS)
    }
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<LdapConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<LdapConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let mut settings = LdapConnSettings::new();
        if let Some(limit) = self.config.connection_timeout() {
            settings = settings.set_conn_timeout(limit);
        }

        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(map_ldap_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Option<Duration>,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, identity: &str, password: &str) -> Result<()> {
        let limit = self.operation_timeout;
        let result = bounded(limit, "bind", self.inner.simple_bind(identity, password)).await?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(&mut self, request: &SearchFilter) -> Result<Vec<LdapEntry>> {
        let limit = self.operation_timeout;
        let params = SearchParams::from_filter(request);
        let result = bounded(
            limit,
            "search",
            self.inner.with_search_options(params.options()).search(
                params.base_dn,
                params.scope,
                params.filter,
                params.attributes,
            ),
        )
        .await?;
        let (entries, _) = result.success().map_err(map_ldap_error)?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        let limit = self.operation_timeout;
        bounded(limit, "unbind", self.inner.unbind()).await
    }
}

/// Protocol-level parameters of a direct search.
struct SearchParams<'a> {
    base_dn: &'a str,
    scope: Scope,
    deref: DerefAliases,
    size_limit: i32,
    time_limit: i32,
    filter: &'a str,
    attributes: Vec<String>,
}

impl<'a> SearchParams<'a> {
    fn from_filter(request: &'a SearchFilter) -> Self {
        Self {
            base_dn: request.base_dn(),
            scope: Scope::Subtree,
            deref: DerefAliases::Never,
            size_limit: request.size_limit(),
            time_limit: request.time_limit(),
            filter: request.filter(),
            attributes: request.attributes().to_vec(),
        }
    }

    fn options(&self) -> SearchOptions {
        SearchOptions::new()
            .deref(self.deref)
            .sizelimit(self.size_limit)
            .timelimit(self.time_limit)
    }
}

async fn bounded<F, T>(limit: Option<Duration>, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = ldap3::result::Result<T>>,
{
    let result = match limit {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(format!("LDAP {operation} timed out")))?,
        None => fut.await,
    };
    result.map_err(map_ldap_error)
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::ExternalServiceError {
        service: "ldap".to_string(),
        message: err.to_string(),
    }
}

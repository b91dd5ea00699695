//! Group resolution: search, normalize, match.

use crate::directory::{Backend, DirectorySearcher};
use crate::error::{Error, StatusError, StatusResult, NO_TRANSPORT_STATUS};
use crate::groups::{match_groups, parse_member_of, AcceptedGroups};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Accepted groups the subject belongs to; never empty.
    pub groups: Vec<String>,
    /// Status reported by the search transport.
    pub status: u16,
}

/// Resolves a subject's accepted groups through a [`DirectorySearcher`].
///
/// An empty match is always reported as [`Error::NoMatchingGroup`], whichever transport is
/// in use, so any `Ok` means the subject is authorized.
#[derive(Clone)]
pub struct GroupResolver {
    searcher: Arc<dyn DirectorySearcher>,
    accepted: Arc<AcceptedGroups>,
}

impl GroupResolver {
    /// Create a resolver over a searcher and an allow-list.
    #[must_use]
    pub fn new(searcher: Arc<dyn DirectorySearcher>, accepted: AcceptedGroups) -> Self {
        Self {
            searcher,
            accepted: Arc::new(accepted),
        }
    }

    /// The allow-list used for matching.
    #[must_use]
    pub fn accepted_groups(&self) -> &AcceptedGroups {
        &self.accepted
    }

    /// The transport behind this resolver.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.searcher.backend()
    }

    /// Resolve the accepted groups of `subject_id`.
    ///
    /// # Errors
    ///
    /// Returns the search failure with its transport status, or, with status `0`,
    /// [`Error::UnexpectedRecordCount`], [`Error::MalformedGroup`] or
    /// [`Error::NoMatchingGroup`].
    pub async fn resolve_groups(&self, subject_id: &str) -> StatusResult<Resolution> {
        let backend = self.searcher.backend();
        info!(subject = %subject_id, %backend, "Resolving directory groups");

        let response = self.searcher.search(subject_id).await.map_err(|err| {
            warn!(subject = %subject_id, status = err.status, error = %err, "Directory search failed");
            err
        })?;
        let status = response.status;

        let groups = parse_member_of(response.records)
            .map_err(|err| StatusError::new(NO_TRANSPORT_STATUS, err))?;
        debug!(subject = %subject_id, ?groups, "Normalized directory groups");

        let matches = match_groups(&groups, &self.accepted);
        if matches.is_empty() {
            return Err(StatusError::new(
                NO_TRANSPORT_STATUS,
                Error::NoMatchingGroup(subject_id.to_string()),
            ));
        }

        info!(subject = %subject_id, ?matches, status, "Subject authorized");
        Ok(Resolution {
            groups: matches,
            status,
        })
    }

    /// Check that the directory is reachable.
    ///
    /// Used by readiness checks; nothing else depends on it.
    ///
    /// # Errors
    ///
    /// Returns the ping failure with its transport status.
    pub async fn health_check(&self) -> StatusResult<u16> {
        match self.searcher.ping().await {
            Ok(status) => {
                info!(backend = %self.searcher.backend(), status, "Directory reachable");
                Ok(status)
            }
            Err(err) => {
                warn!(backend = %self.searcher.backend(), status = err.status, error = %err, "Directory ping failed");
                Err(err)
            }
        }
    }
}

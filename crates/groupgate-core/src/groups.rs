//! Group-name normalization and allow-list matching.

use crate::directory::DirectoryRecord;
use crate::error::{Error, Result};
use std::fmt;

/// Group accepted when no allow-list is configured.
pub const DEFAULT_ACCEPTED_GROUP: &str = "some_user_group";

/// The authorization allow-list.
///
/// Built once at startup and shared read-only; order and duplicates are kept because the
/// matcher emits one entry per equal pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedGroups {
    groups: Vec<String>,
}

impl AcceptedGroups {
    /// Creates an allow-list from group names.
    #[must_use]
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma-separated list, ignoring blank entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the list has no names.
    pub fn parse(list: &str) -> Result<Self> {
        let groups = Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        );
        if groups.is_empty() {
            return Err(Error::ConfigError(
                "accepted group list is empty".to_string(),
            ));
        }
        Ok(groups)
    }

    /// Group names in configured order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.groups
    }

    /// Returns true if `group` is on the allow-list.
    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.groups.iter().any(|accepted| accepted == group)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if the allow-list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for AcceptedGroups {
    fn default() -> Self {
        Self::new([DEFAULT_ACCEPTED_GROUP])
    }
}

impl fmt::Display for AcceptedGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.groups.join(","))
    }
}

/// Extracts plain group names from the `memberOf` values of a single search result.
///
/// Each value keeps only the value of its leading RDN, so
/// `CN=GroupA,OU=Groups,DC=example,DC=com` becomes `GroupA`. Output order and length
/// follow the input.
///
/// # Errors
///
/// Returns [`Error::UnexpectedRecordCount`] unless exactly one record is given, and
/// [`Error::MalformedGroup`] if a value's leading segment has no `=`.
pub fn parse_member_of(records: Vec<DirectoryRecord>) -> Result<Vec<String>> {
    if records.len() != 1 {
        return Err(Error::UnexpectedRecordCount(records.len()));
    }

    records
        .into_iter()
        .flat_map(|record| record.member_of)
        .map(|value| leading_rdn_value(&value))
        .collect()
}

fn leading_rdn_value(value: &str) -> Result<String> {
    let leading = value.split(',').next().unwrap_or_default();
    leading
        .split('=')
        .nth(1)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedGroup(value.to_string()))
}

/// Returns the accepted groups found in `groups`.
///
/// Scans `groups` in order and, for each entry, emits every equal allow-list entry. This is
/// not a set intersection: a group repeated in `groups` is emitted once per repetition.
#[must_use]
pub fn match_groups(groups: &[String], accepted: &AcceptedGroups) -> Vec<String> {
    let mut matches = Vec::new();
    for group in groups {
        for candidate in accepted.as_slice() {
            if group == candidate {
                matches.push(candidate.clone());
            }
        }
    }
    matches
}

//! # groupgate-core
//!
//! Core types and the group-membership resolution pipeline.
//!
//! A subject identifier is looked up through a [`DirectorySearcher`], the single returned
//! record's `memberOf` values are normalized into plain group names, and those names are
//! matched against an [`AcceptedGroups`] allow-list.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and status-code pairing
//! - [`directory`] - Directory records, search filters, and the searcher capability
//! - [`groups`] - `memberOf` normalization and allow-list matching
//! - [`resolver`] - The [`GroupResolver`] orchestrator and health check
//! - [`config`] - Directory API configuration and environment lookup
//! - [`credentials`] - Service account and basic-auth secrets
//! - [`client`] - HTTP client settings and CA bundle loading

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod groups;
pub mod resolver;

// Re-export commonly used types
pub use directory::{Backend, DirectoryRecord, DirectorySearcher, SearchFilter, SearchResponse};
pub use error::{Error, Result, StatusError, StatusResult};
pub use groups::AcceptedGroups;
pub use resolver::{GroupResolver, Resolution};

//! Directory API transport for groupgate.
//!
//! [`ApiSearcher`] posts search requests to the HTTP API that fronts the directory and
//! decodes the `{"message": [...]}` envelope into [`groupgate_core::DirectoryRecord`]s.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{ApiSearcher, ApiSearcherBuilder};
pub use models::SearchEnvelope;

/// Convenient result alias that reuses the shared groupgate error type.
pub type Result<T> = groupgate_core::Result<T>;

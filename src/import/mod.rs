//! Poster import from external media servers.
//!
//! A client drives an import as a series of independent HTTP calls, echoing
//! back the cursor and running totals it received; nothing about a job is
//! kept on the server between calls.

pub mod batch;
pub mod conflict;
pub mod error;
pub mod filename;
pub mod handlers;
pub mod orchestrator;
pub mod pagination;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ImportError, ProviderError};
pub use handlers::import_handler;
pub use orchestrator::{ImportRequest, ImportResponse, Importer};
pub use provider::{MediaProvider, ProviderKind, connect};
pub use types::{
    BatchResult, ContentCategory, Library, LibraryKind, MediaItem, OverwritePolicy, Page,
    Progress, SkipReason, SkippedDetail, TotalStats,
};

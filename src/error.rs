//! Error types for the slidepress pipeline.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`]: **Fatal**: the run cannot complete (source object
//!   unreadable, deck malformed, a write failed). Coordinators capture it
//!   into their report's `error` field instead of returning it, so the
//!   trigger host always receives a structured result.
//!
//! * [`RecordError`]: **Non-fatal**: one metadata record could not be
//!   fetched or parsed during aggregation. The record is excluded and the
//!   error is listed in [`crate::output::AggregationReport`]; every other
//!   record still counts.
//!
//! Collaborator failures have their own small enums, [`StorageError`] and
//! [`CacheError`], which the coordinators wrap with the key or step that
//! failed.

use thiserror::Error;

/// Failure reported by an [`crate::storage::ObjectStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object exists under the key.
    #[error("object '{bucket}/{key}' does not exist")]
    NotFound { bucket: String, key: String },

    /// The store refused access to the key.
    #[error("access denied to '{bucket}/{key}'")]
    AccessDenied { bucket: String, key: String },

    /// Local I/O failure underneath the store.
    #[error("I/O error on '{bucket}/{key}': {source}")]
    Io {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure (network, throttling, service error).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure reported by a [`crate::cache::CacheInvalidator`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache invalidation rejected for distribution '{distribution_id}': {reason}")]
    Rejected {
        distribution_id: String,
        reason: String,
    },

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// All fatal errors of a conversion or aggregation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source object could not be downloaded.
    #[error("failed to fetch '{bucket}/{key}': {source}")]
    FetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// The source bytes are not a readable presentation.
    #[error("'{key}' is not a valid presentation: {source}")]
    ParseFailed {
        key: String,
        #[source]
        source: pptx_reader::ReadError,
    },

    /// A notification payload could not be decoded.
    #[error("invalid storage event: {0}")]
    InvalidEvent(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// PDF or HTML generation failed.
    #[error("failed to render {what}: {detail}")]
    RenderFailed { what: &'static str, detail: String },

    /// Writing an object failed.
    #[error("failed to write '{bucket}/{key}': {source}")]
    PersistFailed {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// Enumerating a namespace failed.
    #[error("failed to list '{bucket}/{prefix}': {source}")]
    ListFailed {
        bucket: String,
        prefix: String,
        #[source]
        source: StorageError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single metadata record.
///
/// Stored in [`crate::output::AggregationReport::rejected_records`]; the
/// aggregation continues without the record.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    /// The record could not be downloaded.
    #[error("{key}: fetch failed: {detail}")]
    FetchFailed { key: String, detail: String },

    /// The record is not a valid conversion-metadata document.
    #[error("{key}: malformed metadata: {detail}")]
    Malformed { key: String, detail: String },
}

impl RecordError {
    pub fn key(&self) -> &str {
        match self {
            RecordError::FetchFailed { key, .. } | RecordError::Malformed { key, .. } => key,
        }
    }
}

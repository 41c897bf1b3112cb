//! Content-delivery cache collaborator.
//!
//! After the dashboard is rewritten, edge caches may still serve the old
//! copy until it expires. When a distribution id is configured the
//! aggregation stage asks the cache service to drop the configured paths.

use crate::error::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Issues invalidation requests against a content-delivery distribution.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Request invalidation of `paths` (e.g. `["/*"]`).
    ///
    /// `caller_reference` must be unique per request; the service uses it
    /// to de-duplicate retries.
    async fn invalidate(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<(), CacheError>;
}

/// `dashboard-refresh-{unix_millis}`
pub fn caller_reference(at: DateTime<Utc>) -> String {
    format!("dashboard-refresh-{}", at.timestamp_millis())
}

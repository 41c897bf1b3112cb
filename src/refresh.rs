//! Aggregation stage: every metadata record → dashboard page → cache flush.
//!
//! ## Why a full rescan?
//!
//! Each run lists and reads the whole metadata namespace instead of applying
//! the one record that triggered it. Runs therefore carry no state, any run
//! can repair the dashboard, and a record removed from storage disappears
//! from the page on the next run.
//!
//! ## Concurrent runs
//!
//! Two uploads close together trigger two runs that race to write the same
//! dashboard key. By default the last writer wins; both pages are complete
//! and the later run saw at least as many records. With
//! [`PipelineConfig::sequence_guard`] enabled, each run stamps a token taken
//! at its start and stores it next to the dashboard. A run that finds a
//! newer token discards its page and reports `superseded`.

use crate::cache::{caller_reference, CacheInvalidator};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, RecordError, StorageError};
use crate::event::StorageEvent;
use crate::keys;
use crate::output::{AggregationReport, AggregationStage, AggregationStatus, CacheInvalidation};
use crate::pipeline::aggregate::{aggregate, MetadataRecord};
use crate::pipeline::dashboard::render_dashboard;
use crate::storage::{ObjectMeta, ObjectStore};
use crate::{system_clock, Clock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the aggregation stage against injected collaborators.
#[derive(Clone)]
pub struct AggregationCoordinator {
    store: Arc<dyn ObjectStore>,
    cache: Option<Arc<dyn CacheInvalidator>>,
    config: Arc<PipelineConfig>,
    clock: Clock,
}

impl AggregationCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, config: PipelineConfig) -> Self {
        Self {
            store,
            cache: None,
            config: Arc::new(config),
            clock: system_clock(),
        }
    }

    /// Attach a cache invalidator. It is only called when
    /// [`PipelineConfig::distribution_id`] is set.
    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rebuild the dashboard of the bucket named by `event`.
    ///
    /// Never returns an error: failures are captured in the report.
    pub async fn run(&self, event: &StorageEvent) -> AggregationReport {
        let mut report = AggregationReport::triggered();
        info!(
            "Dashboard refresh triggered by {}/{}",
            event.bucket, event.key
        );

        if let Err(e) = self.execute(&event.bucket, &mut report).await {
            error!(
                "Dashboard refresh failed after stage {:?}: {}",
                report.stage, e
            );
            report.status = AggregationStatus::Failed;
            report.error = Some(e.to_string());
        }
        report
    }

    async fn execute(
        &self,
        bucket: &str,
        report: &mut AggregationReport,
    ) -> Result<(), PipelineError> {
        let started_at = (self.clock)();
        let token = sequence_token(started_at);

        // ── Step 1: List ─────────────────────────────────────────────────
        let prefix = self.config.metadata_prefix.as_str();
        let listed = self
            .store
            .list_objects(bucket, prefix)
            .await
            .map_err(|source| PipelineError::ListFailed {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                source,
            })?;
        let keys: Vec<String> = listed
            .into_iter()
            .filter(|k| keys::has_extension(k, "json"))
            .collect();
        report.stage = AggregationStage::Listed;
        info!("Found {} metadata records under {}", keys.len(), prefix);

        // ── Step 2: Fetch ────────────────────────────────────────────────
        let mut records = Vec::with_capacity(keys.len());
        let mut fetch_errors = Vec::new();
        for key in keys {
            match self.store.get_object(bucket, &key).await {
                Ok(body) => {
                    debug!("Read {}", key);
                    records.push(MetadataRecord { key, body });
                }
                Err(e) => {
                    warn!("Error reading {}: {}", key, e);
                    fetch_errors.push(RecordError::FetchFailed {
                        key,
                        detail: e.to_string(),
                    });
                }
            }
        }
        report.stage = AggregationStage::Fetched;

        // ── Step 3: Aggregate ────────────────────────────────────────────
        let aggregation = aggregate(&records, started_at);
        let snapshot = aggregation.snapshot;
        report.total_documents = snapshot.total_documents;
        report.total_slides = snapshot.total_slides;
        report.rejected_records = fetch_errors;
        report.rejected_records.extend(aggregation.rejected);
        report.stage = AggregationStage::Aggregated;
        info!(
            "Found {} documents with {} total slides ({} rejected)",
            snapshot.total_documents,
            snapshot.total_slides,
            report.rejected_records.len()
        );

        // ── Step 4: Render ───────────────────────────────────────────────
        let html = render_dashboard(&snapshot, &self.config.inbox_prefix)?;
        report.stage = AggregationStage::Rendered;

        // ── Step 5: Persist ──────────────────────────────────────────────
        if self.config.sequence_guard {
            if let Some(newer) = self.newer_token(bucket, token).await {
                info!(
                    "Dashboard already written by a newer run (token {} > {}); discarding",
                    newer, token
                );
                report.status = AggregationStatus::Superseded;
                return Ok(());
            }
        }

        let dashboard_key = self.config.dashboard_key.as_str();
        self.store
            .put_object(
                bucket,
                dashboard_key,
                html.into_bytes(),
                &ObjectMeta::html(self.config.dashboard_cache_control.clone()),
            )
            .await
            .map_err(|source| PipelineError::PersistFailed {
                bucket: bucket.to_string(),
                key: dashboard_key.to_string(),
                source,
            })?;
        report.stage = AggregationStage::Persisted;
        report.dashboard_key = Some(dashboard_key.to_string());
        info!("Wrote {}", dashboard_key);

        if self.config.sequence_guard {
            self.store_token(bucket, token).await;
        }

        // ── Step 6: Invalidate cache ─────────────────────────────────────
        report.cache_invalidated = self.invalidate().await;
        report.stage = AggregationStage::CacheInvalidated;

        report.stage = AggregationStage::Complete;
        report.status = AggregationStatus::Success;
        Ok(())
    }

    async fn invalidate(&self) -> CacheInvalidation {
        let (Some(distribution_id), Some(cache)) =
            (self.config.distribution_id.as_deref(), self.cache.as_ref())
        else {
            debug!("No distribution configured; skipping cache invalidation");
            return CacheInvalidation::Skipped;
        };

        let reference = caller_reference((self.clock)());
        match cache
            .invalidate(distribution_id, &self.config.invalidation_paths, &reference)
            .await
        {
            Ok(()) => {
                info!("Cache invalidation requested for {}", distribution_id);
                CacheInvalidation::Invalidated
            }
            Err(e) => {
                warn!("Cache invalidation for {} failed: {}", distribution_id, e);
                CacheInvalidation::Failed
            }
        }
    }

    /// The stored token, if it is newer than `token`. An unreadable token
    /// does not block the write.
    async fn newer_token(&self, bucket: &str, token: i64) -> Option<i64> {
        let key = self.config.sequence_key.as_str();
        let stored = match self.store.get_object(bucket, key).await {
            Ok(body) => body,
            Err(StorageError::NotFound { .. }) => return None,
            Err(e) => {
                warn!("Could not read sequence token {}: {}", key, e);
                return None;
            }
        };
        match String::from_utf8_lossy(&stored).trim().parse::<i64>() {
            Ok(stored) if stored > token => Some(stored),
            Ok(_) => None,
            Err(_) => {
                warn!("Ignoring unparsable sequence token in {}", key);
                None
            }
        }
    }

    async fn store_token(&self, bucket: &str, token: i64) {
        let key = self.config.sequence_key.as_str();
        if let Err(e) = self
            .store
            .put_object(bucket, key, token.to_string().into_bytes(), &ObjectMeta::text())
            .await
        {
            warn!("Could not store sequence token {}: {}", key, e);
        }
    }
}

/// Nanoseconds since the epoch; saturates outside the representable range.
fn sequence_token(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn fixed(h: u32) -> Clock {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap();
        Arc::new(move || at)
    }

    fn seed(store: &MemoryStore, name: &str, slides: u64) {
        store.insert(
            "b",
            &format!("metadata/{name}.json"),
            serde_json::json!({
                "pdf_name": format!("{name}.pdf"),
                "original_name": format!("{name}.pptx"),
                "slide_count": slides,
                "create_date": "2024-05-01T00:00:00Z",
                "pdf_path": format!("pdfs/{name}.pdf"),
                "source_path": format!("pptxs/{name}.pptx"),
            })
            .to_string(),
        );
    }

    #[tokio::test]
    async fn writes_dashboard_with_cache_headers() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 2);
        seed(&store, "b", 5);
        store.insert("b", "metadata/notes.txt", "ignored");

        let report = AggregationCoordinator::new(store.clone(), PipelineConfig::default())
            .with_clock(fixed(9))
            .run(&StorageEvent::new("b", "metadata/a.json"))
            .await;

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.total_documents, 2);
        assert_eq!(report.total_slides, 7);
        assert_eq!(report.cache_invalidated, CacheInvalidation::Skipped);
        assert_eq!(report.dashboard_key.as_deref(), Some("index.html"));
        let meta = store.meta("b", "index.html").unwrap();
        assert_eq!(meta.content_type, "text/html");
        assert_eq!(meta.cache_control.as_deref(), Some("max-age=60"));
    }

    #[tokio::test]
    async fn older_run_is_superseded_when_guarded() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 1);
        let config = PipelineConfig::builder().sequence_guard(true).build().unwrap();

        let newer = AggregationCoordinator::new(store.clone(), config.clone()).with_clock(fixed(10));
        let older = AggregationCoordinator::new(store.clone(), config).with_clock(fixed(9));

        let first = newer.run(&StorageEvent::new("b", "metadata/a.json")).await;
        assert!(first.is_success());
        let page = store.get("b", "index.html").unwrap();

        seed(&store, "late", 4);
        let second = older.run(&StorageEvent::new("b", "metadata/late.json")).await;
        assert_eq!(second.status, AggregationStatus::Superseded);
        assert_eq!(second.dashboard_key, None);
        assert_eq!(store.get("b", "index.html").unwrap(), page);
    }

    #[tokio::test]
    async fn unguarded_runs_are_last_writer_wins() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", 1);
        let config = PipelineConfig::default();
        AggregationCoordinator::new(store.clone(), config.clone())
            .with_clock(fixed(10))
            .run(&StorageEvent::new("b", "metadata/a.json"))
            .await;
        let report = AggregationCoordinator::new(store.clone(), config)
            .with_clock(fixed(9))
            .run(&StorageEvent::new("b", "metadata/a.json"))
            .await;
        assert!(report.is_success());
        assert!(store.get("b", ".dashboard-sequence").is_none());
    }
}

//! Conversion stage: one uploaded deck → PDF summary + metadata record.
//!
//! ## Why write the PDF first?
//!
//! The metadata record is what the aggregation stage counts. Writing it only
//! after the PDF landed means the dashboard never links to a PDF that does
//! not exist. The converse (a PDF without metadata) can still happen when
//! the second write fails; [`crate::reconcile`] sweeps those up.
//!
//! ## Why spawn_blocking?
//!
//! Unzipping, XML parsing and PDF layout are CPU-bound. Running them on the
//! blocking pool keeps the async workers free for storage I/O of concurrent
//! runs.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event::StorageEvent;
use crate::keys;
use crate::output::{
    format_create_date, ConversionMetadata, ConversionReport, ConversionStage, ConversionStatus,
};
use crate::pipeline::{extract, render};
use crate::storage::{ObjectMeta, ObjectStore};
use crate::{system_clock, Clock};
use pptx_reader::Presentation;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs the conversion stage against an injected object store.
///
/// Cheap to clone; clones share the store and configuration.
#[derive(Clone)]
pub struct ConversionCoordinator {
    store: Arc<dyn ObjectStore>,
    config: Arc<PipelineConfig>,
    clock: Clock,
}

impl ConversionCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>, config: PipelineConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            clock: system_clock(),
        }
    }

    /// Replace the time source used for `create_date` and the PDF header.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert the object named by `event`.
    ///
    /// Never returns an error: failures are captured in the report with
    /// `status: failed` and the stage reached.
    pub async fn run(&self, event: &StorageEvent) -> ConversionReport {
        let started = Instant::now();
        let mut report = ConversionReport::received(&event.key);
        info!("Starting conversion: {}/{}", event.bucket, event.key);

        match self.execute(event, &mut report).await {
            Ok(()) => {
                debug!(
                    "Conversion of {} finished in {}ms",
                    event.key,
                    started.elapsed().as_millis()
                );
            }
            Err(e) => {
                error!(
                    "Conversion of {} failed after stage {:?}: {}",
                    event.key, report.stage, e
                );
                report.status = ConversionStatus::Failed;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    async fn execute(
        &self,
        event: &StorageEvent,
        report: &mut ConversionReport,
    ) -> Result<(), PipelineError> {
        let bucket = event.bucket.as_str();
        let key = event.key.as_str();

        // ── Step 1: Validate ─────────────────────────────────────────────
        if !self.config.is_presentation_key(key) {
            warn!("Skipping non-presentation object: {}", key);
            report.status = ConversionStatus::Skipped;
            report.stage = ConversionStage::Complete;
            return Ok(());
        }
        report.stage = ConversionStage::Validated;

        // ── Step 2: Fetch ────────────────────────────────────────────────
        let bytes = self
            .store
            .get_object(bucket, key)
            .await
            .map_err(|source| PipelineError::FetchFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })?;
        report.stage = ConversionStage::Fetched;
        debug!("Fetched {} bytes from {}", bytes.len(), key);

        // ── Step 3: Parse and extract ────────────────────────────────────
        let parse_key = key.to_string();
        let slides = tokio::task::spawn_blocking(move || {
            Presentation::from_bytes(&bytes)
                .map(|deck| extract::extract(&deck))
                .map_err(|source| PipelineError::ParseFailed {
                    key: parse_key,
                    source,
                })
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {}", e)))??;
        report.stage = ConversionStage::Extracted;
        for slide in &slides {
            debug!("Slide {}: {}", slide.slide_number, slide.title);
        }
        let slide_count = slides.len();
        info!("Extracted {} slides from {}", slide_count, key);

        // ── Step 4: Render ───────────────────────────────────────────────
        let now = (self.clock)();
        let original_name = keys::file_name(key).to_string();
        let label = original_name.clone();
        let pdf = tokio::task::spawn_blocking(move || render::render(&slides, &label, now))
            .await
            .map_err(|e| PipelineError::Internal(format!("Render task panicked: {}", e)))??;
        report.stage = ConversionStage::Rendered;
        debug!("Rendered {} byte PDF", pdf.len());

        // ── Step 5: Persist PDF ──────────────────────────────────────────
        let pdf_key = keys::pdf_key(&self.config, key);
        self.put(bucket, &pdf_key, pdf, &ObjectMeta::pdf()).await?;
        report.stage = ConversionStage::PdfPersisted;
        report.pdf_path = Some(pdf_key.clone());
        info!("Wrote {}", pdf_key);

        // ── Step 6: Persist metadata ─────────────────────────────────────
        let metadata = ConversionMetadata {
            pdf_name: keys::file_name(&pdf_key).to_string(),
            original_name,
            slide_count: slide_count as u64,
            create_date: format_create_date(now),
            pdf_path: pdf_key.clone(),
            source_path: key.to_string(),
        };
        let body = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| PipelineError::Internal(format!("metadata serialisation: {e}")))?;
        let metadata_key = keys::metadata_key(&self.config, key);
        self.put(bucket, &metadata_key, body, &ObjectMeta::json()).await?;
        report.stage = ConversionStage::MetadataPersisted;
        report.metadata_path = Some(metadata_key.clone());
        info!("Wrote {}", metadata_key);

        report.stage = ConversionStage::Complete;
        report.status = ConversionStatus::Success;
        report.slide_count = Some(slide_count);
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        meta: &ObjectMeta,
    ) -> Result<(), PipelineError> {
        self.store
            .put_object(bucket, key, body, meta)
            .await
            .map_err(|source| PipelineError::PersistFailed {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            })
    }
}

//! Dangling-PDF sweep.
//!
//! A conversion that wrote its PDF but failed on the metadata write leaves a
//! PDF the dashboard never shows. [`Reconciler::sweep`] finds those PDFs and
//! re-runs conversion for their source deck. Conversion overwrites both
//! outputs, so repairing twice is harmless and a second sweep finds nothing.

use crate::convert::ConversionCoordinator;
use crate::error::PipelineError;
use crate::event::StorageEvent;
use crate::keys;
use crate::storage::ObjectStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one sweep. All entries are PDF keys, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// PDFs that had no metadata record when the sweep started.
    pub dangling: Vec<String>,
    /// Dangling PDFs whose deck was converted again successfully.
    pub repaired: Vec<String>,
    /// Dangling PDFs with no source deck, or whose reconversion failed.
    pub unrecoverable: Vec<String>,
}

/// Finds and repairs PDFs that have no metadata record.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    converter: ConversionCoordinator,
}

impl Reconciler {
    /// The converter's store and configuration are used for the sweep.
    pub fn new(store: Arc<dyn ObjectStore>, converter: ConversionCoordinator) -> Self {
        Self { store, converter }
    }

    pub async fn sweep(&self, bucket: &str) -> Result<SweepReport, PipelineError> {
        let config = self.converter.config();
        let pdfs = self.list(bucket, &config.pdf_prefix).await?;
        let metadata = self.list(bucket, &config.metadata_prefix).await?;

        let recorded: BTreeSet<&str> = metadata
            .iter()
            .filter(|k| keys::has_extension(k, "json"))
            .map(|k| keys::base_name(k))
            .collect();
        let dangling: Vec<String> = pdfs
            .into_iter()
            .filter(|k| keys::has_extension(k, "pdf"))
            .filter(|k| !recorded.contains(keys::base_name(k)))
            .collect();

        let mut report = SweepReport {
            dangling: dangling.clone(),
            ..SweepReport::default()
        };
        if dangling.is_empty() {
            info!("Sweep of {}: no dangling PDFs", bucket);
            return Ok(report);
        }
        info!("Sweep of {}: {} dangling PDFs", bucket, dangling.len());

        // First accepted source per base, in key order.
        let mut sources: BTreeMap<String, String> = BTreeMap::new();
        for key in self.list(bucket, &config.inbox_prefix).await? {
            if config.is_presentation_key(&key) {
                sources
                    .entry(keys::base_name(&key).to_string())
                    .or_insert(key);
            }
        }

        for pdf_key in dangling {
            let Some(source) = sources.get(keys::base_name(&pdf_key)) else {
                warn!("No source deck for dangling PDF {}", pdf_key);
                report.unrecoverable.push(pdf_key);
                continue;
            };
            let event = StorageEvent {
                bucket: bucket.to_string(),
                key: source.clone(),
                event_name: "Reconcile".to_string(),
            };
            let outcome = self.converter.run(&event).await;
            if outcome.is_success() {
                info!("Repaired {} from {}", pdf_key, source);
                report.repaired.push(pdf_key);
            } else {
                warn!(
                    "Could not repair {}: {}",
                    pdf_key,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                report.unrecoverable.push(pdf_key);
            }
        }

        Ok(report)
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, PipelineError> {
        self.store
            .list_objects(bucket, prefix)
            .await
            .map_err(|source| PipelineError::ListFailed {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                source,
            })
    }
}

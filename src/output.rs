//! Records, snapshots and run reports.
//!
//! [`ConversionMetadata`] is the persisted contract between the two stages:
//! the conversion stage writes one per deck, the aggregation stage reads all
//! of them. Everything else here is returned to the trigger host and never
//! persisted.

use crate::error::RecordError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Persisted metadata ───────────────────────────────────────────────────

/// Metadata written next to every rendered PDF.
///
/// Keys are snake_case on the wire. On read every field is optional so
/// records written by older producers still aggregate; a missing or null
/// `slide_count` counts as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// File name of the PDF, e.g. `q3_review.pdf`.
    #[serde(default)]
    pub pdf_name: String,

    /// File name of the uploaded deck, e.g. `q3_review.pptx`.
    #[serde(default)]
    pub original_name: String,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub slide_count: u64,

    /// UTC ISO-8601 timestamp with a trailing `Z`.
    #[serde(default)]
    pub create_date: String,

    /// Storage key of the PDF, e.g. `pdfs/q3_review.pdf`.
    #[serde(default)]
    pub pdf_path: String,

    /// Storage key of the uploaded deck.
    #[serde(default)]
    pub source_path: String,
}

fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(d)?.unwrap_or(0))
}

/// Format a timestamp the way `create_date` is stored:
/// `2024-05-01T12:00:00.123456Z`.
pub fn format_create_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

// ── Dashboard snapshot ───────────────────────────────────────────────────

/// Aggregate view over every readable metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total_documents: usize,
    pub total_slides: u64,
    pub last_updated: DateTime<Utc>,
    /// Sorted by `create_date`, newest first.
    pub documents: Vec<ConversionMetadata>,
}

impl DashboardSnapshot {
    /// Compute totals and order over `documents`.
    ///
    /// The sort compares `create_date` as strings and is stable, so records
    /// with equal dates keep their input order.
    pub fn from_documents(mut documents: Vec<ConversionMetadata>, now: DateTime<Utc>) -> Self {
        documents.sort_by(|a, b| b.create_date.cmp(&a.create_date));
        Self {
            total_documents: documents.len(),
            total_slides: documents
                .iter()
                .fold(0u64, |acc, d| acc.saturating_add(d.slide_count)),
            last_updated: now,
            documents,
        }
    }
}

// ── Conversion report ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Skipped,
    Success,
    Failed,
}

/// Furthest point a conversion run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    Received,
    Validated,
    Fetched,
    Extracted,
    Rendered,
    PdfPersisted,
    MetadataPersisted,
    Complete,
}

/// Result of one conversion run, returned to the trigger host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub status: ConversionStatus,
    pub source_key: String,
    pub stage: ConversionStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_count: Option<usize>,
    /// Human-readable cause when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionReport {
    pub(crate) fn received(source_key: &str) -> Self {
        Self {
            status: ConversionStatus::Failed,
            source_key: source_key.to_string(),
            stage: ConversionStage::Received,
            pdf_path: None,
            metadata_path: None,
            slide_count: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

// ── Aggregation report ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStatus {
    Success,
    Failed,
    /// A newer run already persisted the dashboard; this run's output was
    /// discarded.
    Superseded,
}

/// Furthest point an aggregation run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStage {
    Triggered,
    Listed,
    Fetched,
    Aggregated,
    Rendered,
    Persisted,
    CacheInvalidated,
    Complete,
}

/// Outcome of the cache-invalidation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheInvalidation {
    Invalidated,
    Failed,
    /// No distribution configured, no invalidator attached, or the
    /// dashboard was never written.
    Skipped,
}

/// Result of one aggregation run, returned to the trigger host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub status: AggregationStatus,
    pub stage: AggregationStage,
    pub total_documents: usize,
    pub total_slides: u64,
    /// Records left out of the totals, with the reason for each.
    pub rejected_records: Vec<RecordError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_key: Option<String>,
    pub cache_invalidated: CacheInvalidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregationReport {
    pub(crate) fn triggered() -> Self {
        Self {
            status: AggregationStatus::Failed,
            stage: AggregationStage::Triggered,
            total_documents: 0,
            total_slides: 0,
            rejected_records: Vec::new(),
            dashboard_key: None,
            cache_invalidated: CacheInvalidation::Skipped,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AggregationStatus::Success
    }
}

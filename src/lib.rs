//! # slidepress
//!
//! Turn uploaded PowerPoint decks into PDF summaries and keep a dashboard of
//! every conversion, driven entirely by object-storage events.
//!
//! ## Why two stages?
//!
//! Converting a deck and rebuilding the dashboard have different inputs and
//! different failure modes. The conversion stage reads one deck and writes
//! two objects. The aggregation stage reads every metadata record and writes
//! one page. Chaining them through the metadata namespace, rather than
//! calling one from the other, lets each be retried, re-run or repaired on
//! its own, and makes the metadata records the single source of truth.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pptxs/deck.pptx uploaded
//!  │
//!  ├─ convert   fetch → parse → extract → render PDF (spawn_blocking)
//!  │            → pdfs/deck.pdf → metadata/deck.json
//!  │
//! metadata/deck.json written
//!  │
//!  └─ refresh   list metadata/ → fetch all → aggregate → render HTML
//!               → index.html → cache invalidation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidepress::{LocalDirStore, Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LocalDirStore::new("/srv/buckets"));
//!     let pipeline = Pipeline::new(store, PipelineConfig::from_env()?);
//!
//!     let payload = std::fs::read("notification.json")?;
//!     for report in pipeline.handle_notification(&payload).await? {
//!         println!("{}", serde_json::to_string_pretty(&report)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Storage layout
//!
//! | Key | Written by |
//! |-----|------------|
//! | `pptxs/{name}.pptx` | uploader |
//! | `pdfs/{base}.pdf` | conversion |
//! | `metadata/{base}.json` | conversion |
//! | `index.html` | aggregation |
//!
//! All prefixes and the dashboard key are configurable through
//! [`PipelineConfig`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod keys;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod refresh;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::CacheInvalidator;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use convert::ConversionCoordinator;
pub use dispatch::{Pipeline, Route, StageReport};
pub use error::{CacheError, PipelineError, RecordError, StorageError};
pub use event::{parse_notification, StorageEvent};
pub use output::{
    AggregationReport, AggregationStage, AggregationStatus, CacheInvalidation, ConversionMetadata,
    ConversionReport, ConversionStage, ConversionStatus, DashboardSnapshot,
};
pub use pipeline::aggregate::{aggregate, Aggregation, MetadataRecord};
pub use pipeline::dashboard::render_dashboard;
pub use pipeline::extract::{extract, SlideRecord};
pub use pipeline::render::render;
pub use reconcile::{Reconciler, SweepReport};
pub use refresh::AggregationCoordinator;
pub use storage::{LocalDirStore, MemoryStore, ObjectMeta, ObjectStore};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Time source injected into the coordinators.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

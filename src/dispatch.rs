//! Event routing: one entry point for every storage notification.
//!
//! The host invokes the pipeline with a raw notification payload. Each
//! record is routed by namespace:
//!
//! | Key under | Event | Goes to |
//! |-----------|-------|---------|
//! | inbox prefix | created | [`ConversionCoordinator`] |
//! | metadata prefix, `.json` | created or removed | [`AggregationCoordinator`] |
//! | anything else | any | ignored |
//!
//! Removals in the metadata namespace also refresh the dashboard so a
//! deleted record disappears from it.

use crate::cache::CacheInvalidator;
use crate::config::PipelineConfig;
use crate::convert::ConversionCoordinator;
use crate::error::PipelineError;
use crate::event::{parse_notification, StorageEvent};
use crate::keys;
use crate::output::{AggregationReport, ConversionReport};
use crate::reconcile::Reconciler;
use crate::refresh::AggregationCoordinator;
use crate::storage::ObjectStore;
use crate::Clock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Which stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Conversion,
    Aggregation,
    Ignored,
}

/// Report for one routed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum StageReport {
    Conversion(ConversionReport),
    Aggregation(AggregationReport),
    Ignored { key: String },
}

/// Both coordinators wired to the same collaborators and configuration.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    config: Arc<PipelineConfig>,
    conversion: ConversionCoordinator,
    aggregation: AggregationCoordinator,
}

impl Pipeline {
    pub fn new(store: Arc<dyn ObjectStore>, config: PipelineConfig) -> Self {
        Self {
            conversion: ConversionCoordinator::new(store.clone(), config.clone()),
            aggregation: AggregationCoordinator::new(store.clone(), config.clone()),
            config: Arc::new(config),
            store,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheInvalidator>) -> Self {
        self.aggregation = self.aggregation.with_cache(cache);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.conversion = self.conversion.with_clock(clock.clone());
        self.aggregation = self.aggregation.with_clock(clock);
        self
    }

    pub fn conversion(&self) -> &ConversionCoordinator {
        &self.conversion
    }

    pub fn aggregation(&self) -> &AggregationCoordinator {
        &self.aggregation
    }

    /// A sweep over dangling PDFs using this pipeline's converter.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone(), self.conversion.clone())
    }

    pub fn route(&self, event: &StorageEvent) -> Route {
        if event.key.starts_with(&self.config.inbox_prefix) && !event.is_removal() {
            Route::Conversion
        } else if event.key.starts_with(&self.config.metadata_prefix)
            && keys::has_extension(&event.key, "json")
        {
            Route::Aggregation
        } else {
            Route::Ignored
        }
    }

    /// Run the stage `event` routes to.
    pub async fn handle(&self, event: &StorageEvent) -> StageReport {
        match self.route(event) {
            Route::Conversion => StageReport::Conversion(self.conversion.run(event).await),
            Route::Aggregation => StageReport::Aggregation(self.aggregation.run(event).await),
            Route::Ignored => {
                debug!("Ignoring {} on {}", event.event_name, event.key);
                StageReport::Ignored {
                    key: event.key.clone(),
                }
            }
        }
    }

    /// Decode a notification payload and handle its records in order.
    ///
    /// Only an undecodable payload is an error; stage failures are in the
    /// returned reports.
    pub async fn handle_notification(
        &self,
        payload: &[u8],
    ) -> Result<Vec<StageReport>, PipelineError> {
        let events = parse_notification(payload)?;
        info!("Notification with {} records", events.len());
        let mut reports = Vec::with_capacity(events.len());
        for event in &events {
            reports.push(self.handle(event).await);
        }
        Ok(reports)
    }
}

//! Configuration for both pipeline stages.
//!
//! Every storage-layout convention and every optional behaviour lives in
//! [`PipelineConfig`], built via its [`PipelineConfigBuilder`]. The
//! coordinators, the router and the reconcile sweep all read the same
//! struct, so the namespaces they agree on can never drift apart.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Configuration shared by the conversion and aggregation coordinators.
///
/// Built via [`PipelineConfig::builder()`], [`PipelineConfig::from_env()`]
/// or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use slidepress::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .inbox_prefix("uploads/")
///     .distribution_id("E2QWRUHAPOMQZL")
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf_prefix, "pdfs/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Namespace watched for uploaded decks. Default: `pptxs/`.
    pub inbox_prefix: String,

    /// Namespace rendered PDFs are written to. Default: `pdfs/`.
    pub pdf_prefix: String,

    /// Namespace metadata records are written to and scanned from.
    /// Default: `metadata/`.
    pub metadata_prefix: String,

    /// Key of the dashboard document. Default: `index.html`.
    pub dashboard_key: String,

    /// `Cache-Control` stored with the dashboard. Default: `max-age=60`.
    ///
    /// Keeps edge caches from serving a stale dashboard for long when no
    /// distribution id is configured.
    pub dashboard_cache_control: Option<String>,

    /// File extensions accepted as presentations, lower-case without the
    /// dot. Matching is case-insensitive. Default: `["pptx"]`.
    pub presentation_extensions: Vec<String>,

    /// Content-delivery distribution to invalidate after each dashboard
    /// write. `None` skips invalidation. Default: `None`.
    pub distribution_id: Option<String>,

    /// Path patterns sent with each invalidation. Default: `["/*"]`.
    pub invalidation_paths: Vec<String>,

    /// Discard a dashboard when a newer aggregation run already persisted
    /// one. Default: false (last writer wins).
    pub sequence_guard: bool,

    /// Key holding the sequence token of the last persisted dashboard.
    /// Default: `.dashboard-sequence`.
    pub sequence_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inbox_prefix: "pptxs/".to_string(),
            pdf_prefix: "pdfs/".to_string(),
            metadata_prefix: "metadata/".to_string(),
            dashboard_key: "index.html".to_string(),
            dashboard_cache_control: Some("max-age=60".to_string()),
            presentation_extensions: vec!["pptx".to_string()],
            distribution_id: None,
            invalidation_paths: vec!["/*".to_string()],
            sequence_guard: false,
            sequence_key: ".dashboard-sequence".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `DISTRIBUTION_ID` | `distribution_id` |
    /// | `SLIDEPRESS_INBOX_PREFIX` | `inbox_prefix` |
    /// | `SLIDEPRESS_PDF_PREFIX` | `pdf_prefix` |
    /// | `SLIDEPRESS_METADATA_PREFIX` | `metadata_prefix` |
    /// | `SLIDEPRESS_DASHBOARD_KEY` | `dashboard_key` |
    /// | `SLIDEPRESS_SEQUENCE_GUARD` | `sequence_guard` (`1`/`true`) |
    ///
    /// Empty values are ignored.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PipelineError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut b = Self::builder();

        if let Some(id) = var("DISTRIBUTION_ID") {
            b = b.distribution_id(id);
        }
        if let Some(p) = var("SLIDEPRESS_INBOX_PREFIX") {
            b = b.inbox_prefix(p);
        }
        if let Some(p) = var("SLIDEPRESS_PDF_PREFIX") {
            b = b.pdf_prefix(p);
        }
        if let Some(p) = var("SLIDEPRESS_METADATA_PREFIX") {
            b = b.metadata_prefix(p);
        }
        if let Some(k) = var("SLIDEPRESS_DASHBOARD_KEY") {
            b = b.dashboard_key(k);
        }
        if let Some(v) = var("SLIDEPRESS_SEQUENCE_GUARD") {
            b = b.sequence_guard(matches!(v.trim(), "1" | "true" | "TRUE" | "yes"));
        }

        b.build()
    }

    /// `true` if `key` ends in one of the accepted presentation extensions.
    pub fn is_presentation_key(&self, key: &str) -> bool {
        crate::keys::extension(key).is_some_and(|ext| {
            self.presentation_extensions
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
        })
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn inbox_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.inbox_prefix = prefix.into();
        self
    }

    pub fn pdf_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.pdf_prefix = prefix.into();
        self
    }

    pub fn metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.metadata_prefix = prefix.into();
        self
    }

    pub fn dashboard_key(mut self, key: impl Into<String>) -> Self {
        self.config.dashboard_key = key.into();
        self
    }

    pub fn dashboard_cache_control(mut self, value: Option<String>) -> Self {
        self.config.dashboard_cache_control = value;
        self
    }

    /// Replace the accepted extensions. Leading dots are stripped and
    /// values lower-cased.
    pub fn presentation_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.presentation_extensions = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn distribution_id(mut self, id: impl Into<String>) -> Self {
        self.config.distribution_id = Some(id.into());
        self
    }

    pub fn invalidation_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.invalidation_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn sequence_guard(mut self, v: bool) -> Self {
        self.config.sequence_guard = v;
        self
    }

    pub fn sequence_key(mut self, key: impl Into<String>) -> Self {
        self.config.sequence_key = key.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        for (field, prefix) in [
            ("inbox_prefix", &c.inbox_prefix),
            ("pdf_prefix", &c.pdf_prefix),
            ("metadata_prefix", &c.metadata_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(PipelineError::InvalidConfig(format!(
                    "{field} must be a non-empty prefix ending in '/', got {prefix:?}"
                )));
            }
        }
        if c.pdf_prefix == c.metadata_prefix {
            return Err(PipelineError::InvalidConfig(
                "pdf_prefix and metadata_prefix must differ".into(),
            ));
        }
        if c.presentation_extensions.iter().all(|e| e.is_empty()) {
            return Err(PipelineError::InvalidConfig(
                "at least one presentation extension is required".into(),
            ));
        }
        if c.dashboard_key.is_empty() || c.dashboard_key.ends_with('/') {
            return Err(PipelineError::InvalidConfig(format!(
                "dashboard_key must name an object, got {:?}",
                c.dashboard_key
            )));
        }
        if c.sequence_guard && c.sequence_key.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "sequence_key is required when sequence_guard is on".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_storage_layout() {
        let c = PipelineConfig::default();
        assert_eq!(c.inbox_prefix, "pptxs/");
        assert_eq!(c.pdf_prefix, "pdfs/");
        assert_eq!(c.metadata_prefix, "metadata/");
        assert_eq!(c.dashboard_key, "index.html");
        assert_eq!(c.invalidation_paths, vec!["/*"]);
        assert!(c.distribution_id.is_none());
        assert!(!c.sequence_guard);
    }

    #[test]
    fn presentation_key_is_case_insensitive() {
        let c = PipelineConfig::default();
        assert!(c.is_presentation_key("pptxs/Deck.PPTX"));
        assert!(c.is_presentation_key("pptxs/deck.pptx"));
        assert!(!c.is_presentation_key("inbox/notes.txt"));
        assert!(!c.is_presentation_key("pptxs/pptx"));
    }

    #[test]
    fn extensions_are_normalised() {
        let c = PipelineConfig::builder()
            .presentation_extensions([".PPTX", "pptm"])
            .build()
            .unwrap();
        assert_eq!(c.presentation_extensions, vec!["pptx", "pptm"]);
        assert!(c.is_presentation_key("a/b.PPTM"));
    }

    #[test]
    fn prefix_without_slash_is_rejected() {
        let err = PipelineConfig::builder()
            .pdf_prefix("pdfs")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("pdf_prefix"), "got: {err}");
    }

    #[test]
    fn identical_output_namespaces_are_rejected() {
        assert!(PipelineConfig::builder()
            .pdf_prefix("out/")
            .metadata_prefix("out/")
            .build()
            .is_err());
    }

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("DISTRIBUTION_ID", "E1ABC"),
            ("SLIDEPRESS_INBOX_PREFIX", "uploads/"),
            ("SLIDEPRESS_SEQUENCE_GUARD", "true"),
            ("SLIDEPRESS_DASHBOARD_KEY", ""),
        ]
        .into_iter()
        .collect();
        let c = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.distribution_id.as_deref(), Some("E1ABC"));
        assert_eq!(c.inbox_prefix, "uploads/");
        assert!(c.sequence_guard);
        assert_eq!(c.dashboard_key, "index.html");
    }
}

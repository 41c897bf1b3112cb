//! Dashboard rendering: [`DashboardSnapshot`] → HTML.
//!
//! The layout is a compiled askama template (`templates/dashboard.html`).
//! Every interpolated value is HTML-escaped by the template engine, so a
//! document named `<script>.pptx` shows up as text. Download links are
//! limited to relative paths by [`link_target`].

use crate::error::PipelineError;
use crate::output::{ConversionMetadata, DashboardSnapshot};
use askama::Template;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DISPLAY_FORMAT: &str = "%b %d, %Y %H:%M";

/// One table row, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub document_name: String,
    pub original_name: String,
    pub slide_count: u64,
    pub create_date: String,
    pub pdf_path: String,
}

impl From<&ConversionMetadata> for DashboardRow {
    fn from(doc: &ConversionMetadata) -> Self {
        Self {
            document_name: non_empty_or(&doc.pdf_name, "Unknown"),
            original_name: doc.original_name.clone(),
            slide_count: doc.slide_count,
            create_date: format_date(&doc.create_date),
            pdf_path: link_target(&doc.pdf_path).to_string(),
        }
    }
}

/// `path` if it is a relative reference into the site, `#` otherwise.
///
/// A scheme (`javascript:`, `https:`), a network path (`//host`), a
/// backslash or a control character all fall back to `#`.
pub fn link_target(path: &str) -> &str {
    let head = path.split(['/', '?', '#']).next().unwrap_or_default();
    let unsafe_link = path.is_empty()
        || head.contains(':')
        || path.starts_with("//")
        || path.contains('\\')
        || path.chars().any(char::is_control);
    if unsafe_link {
        "#"
    } else {
        path
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardPage<'a> {
    total_documents: usize,
    total_slides: u64,
    last_updated: String,
    rows: Vec<DashboardRow>,
    inbox_prefix: &'a str,
}

/// Render the dashboard page. `inbox_prefix` is named in the empty-state
/// hint.
pub fn render_dashboard(
    snapshot: &DashboardSnapshot,
    inbox_prefix: &str,
) -> Result<String, PipelineError> {
    DashboardPage {
        total_documents: snapshot.total_documents,
        total_slides: snapshot.total_slides,
        last_updated: snapshot.last_updated.format(DISPLAY_FORMAT).to_string(),
        rows: snapshot.documents.iter().map(DashboardRow::from).collect(),
        inbox_prefix,
    }
    .render()
    .map_err(|e| PipelineError::RenderFailed {
        what: "dashboard",
        detail: e.to_string(),
    })
}

/// `2024-05-01T12:00:00Z` → `May 01, 2024 12:00`.
///
/// Accepts RFC 3339 (kept in its own offset), a naive date-time or a bare
/// date; anything else is shown as stored.
pub fn format_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.format(DISPLAY_FORMAT).to_string();
    }
    raw.to_string()
}

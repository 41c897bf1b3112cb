//! Metadata aggregation: raw records → [`DashboardSnapshot`].
//!
//! Pure over its input. A record that does not parse, or whose slide count
//! cannot be added to the running total, is left out of every total and
//! reported back as a [`RecordError`]; it never fails the run.

use crate::error::RecordError;
use crate::output::{ConversionMetadata, DashboardSnapshot};
use chrono::{DateTime, Utc};
use tracing::warn;

/// Largest slide count a single record may claim.
pub const MAX_SLIDE_COUNT: u64 = u32::MAX as u64;

/// One fetched metadata object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub key: String,
    pub body: Vec<u8>,
}

impl MetadataRecord {
    pub fn new(key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
        }
    }
}

/// Snapshot plus the records that were rejected on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub snapshot: DashboardSnapshot,
    pub rejected: Vec<RecordError>,
}

/// Parse every record and build the snapshot at time `now`.
pub fn aggregate(records: &[MetadataRecord], now: DateTime<Utc>) -> Aggregation {
    let mut documents = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    let mut total_slides: u64 = 0;

    for record in records {
        let accepted = parse_record(record).and_then(|meta| {
            total_slides = total_slides.checked_add(meta.slide_count).ok_or_else(|| {
                RecordError::Malformed {
                    key: record.key.clone(),
                    detail: format!("slide_count {} overflows the total", meta.slide_count),
                }
            })?;
            Ok(meta)
        });
        match accepted {
            Ok(meta) => documents.push(meta),
            Err(e) => {
                warn!("Skipping metadata record: {}", e);
                rejected.push(e);
            }
        }
    }

    Aggregation {
        snapshot: DashboardSnapshot::from_documents(documents, now),
        rejected,
    }
}

/// A record must be a JSON object whose known fields have the right types.
pub fn parse_record(record: &MetadataRecord) -> Result<ConversionMetadata, RecordError> {
    let malformed = |detail: String| RecordError::Malformed {
        key: record.key.clone(),
        detail,
    };

    let value: serde_json::Value =
        serde_json::from_slice(&record.body).map_err(|e| malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    }
    let meta: ConversionMetadata =
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
    if meta.slide_count > MAX_SLIDE_COUNT {
        return Err(malformed(format!(
            "slide_count {} exceeds {}",
            meta.slide_count, MAX_SLIDE_COUNT
        )));
    }
    Ok(meta)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(name: &str, slides: u64, date: &str) -> MetadataRecord {
        MetadataRecord::new(
            format!("metadata/{name}.json"),
            serde_json::json!({
                "pdf_name": format!("{name}.pdf"),
                "original_name": format!("{name}.pptx"),
                "slide_count": slides,
                "create_date": date,
                "pdf_path": format!("pdfs/{name}.pdf"),
                "source_path": format!("pptxs/{name}.pptx"),
            })
            .to_string(),
        )
    }

    #[test]
    fn totals_match_documents() {
        let records = vec![
            record("a", 3, "2024-01-01T00:00:00Z"),
            record("b", 0, "2024-01-02T00:00:00Z"),
            record("c", 12, "2024-01-03T00:00:00Z"),
        ];
        let agg = aggregate(&records, now());
        assert!(agg.rejected.is_empty());
        assert_eq!(agg.snapshot.total_documents, agg.snapshot.documents.len());
        assert_eq!(
            agg.snapshot.total_slides,
            agg.snapshot.documents.iter().map(|d| d.slide_count).sum::<u64>()
        );
        assert_eq!(agg.snapshot.total_slides, 15);
        assert_eq!(agg.snapshot.documents[0].pdf_name, "c.pdf");
    }

    #[test]
    fn one_malformed_record_of_five_is_excluded() {
        let mut records: Vec<_> = (1..=4)
            .map(|i| record(&format!("d{i}"), i, &format!("2024-01-0{i}T00:00:00Z")))
            .collect();
        records.insert(2, MetadataRecord::new("metadata/broken.json", "{ not json"));

        let agg = aggregate(&records, now());
        assert_eq!(agg.snapshot.total_documents, 4);
        assert_eq!(agg.snapshot.total_slides, 1 + 2 + 3 + 4);
        assert_eq!(agg.rejected.len(), 1);
        assert_eq!(agg.rejected[0].key(), "metadata/broken.json");
    }

    #[test]
    fn non_objects_and_wrong_types_are_rejected() {
        let records = vec![
            MetadataRecord::new("metadata/array.json", r#"["a", 1]"#),
            MetadataRecord::new("metadata/count.json", r#"{"slide_count": "seven"}"#),
            MetadataRecord::new("metadata/negative.json", r#"{"slide_count": -1}"#),
            MetadataRecord::new("metadata/null.json", r#"{"pdf_name": "n.pdf", "slide_count": null}"#),
        ];
        let agg = aggregate(&records, now());
        assert_eq!(agg.snapshot.total_documents, 1);
        assert_eq!(agg.snapshot.total_slides, 0);
        assert_eq!(agg.rejected.len(), 3);
        match &agg.rejected[0] {
            RecordError::Malformed { detail, .. } => assert!(detail.contains("an array"), "{detail}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn absurd_slide_count_is_rejected_not_summed() {
        let records = vec![
            record("huge", u64::MAX, "2024-01-01T00:00:00Z"),
            record("normal", 2, "2024-01-02T00:00:00Z"),
            record("edge", MAX_SLIDE_COUNT, "2024-01-03T00:00:00Z"),
        ];
        let agg = aggregate(&records, now());
        assert_eq!(agg.snapshot.total_documents, 2);
        assert_eq!(agg.snapshot.total_slides, MAX_SLIDE_COUNT + 2);
        assert_eq!(agg.rejected.len(), 1);
        match &agg.rejected[0] {
            RecordError::Malformed { key, detail } => {
                assert_eq!(key, "metadata/huge.json");
                assert!(detail.contains("exceeds"), "{detail}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let agg = aggregate(&[], now());
        assert_eq!(agg.snapshot.total_documents, 0);
        assert_eq!(agg.snapshot.total_slides, 0);
        assert!(agg.snapshot.documents.is_empty());
        assert_eq!(agg.snapshot.last_updated, now());
    }
}

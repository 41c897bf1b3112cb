//! Storage-notification decoding.
//!
//! ## Why decode keys here?
//!
//! Object keys arrive form-encoded in notification payloads (`+` for a
//! space, `%XX` for everything else outside the safe set). Coordinators only
//! ever see decoded keys, so a deck named `Q3 Review.pptx` produces
//! `pdfs/Q3 Review.pdf` rather than `pdfs/Q3+Review.pdf`.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// One object-storage event: the trigger for either pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub key: String,
    /// e.g. `ObjectCreated:Put`. Empty when the source did not say.
    #[serde(default)]
    pub event_name: String,
}

impl StorageEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            event_name: "ObjectCreated:Put".to_string(),
        }
    }

    pub fn is_removal(&self) -> bool {
        self.event_name.starts_with("ObjectRemoved")
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    #[serde(rename = "eventName", default)]
    event_name: String,
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Decode a storage-notification payload into events, in record order.
///
/// A payload without a `Records` array yields no events (test events sent
/// when a notification is first configured look like that).
pub fn parse_notification(payload: &[u8]) -> Result<Vec<StorageEvent>, PipelineError> {
    let notification: Notification = serde_json::from_slice(payload)
        .map_err(|e| PipelineError::InvalidEvent(format!("undecodable notification: {e}")))?;

    notification
        .records
        .into_iter()
        .map(|r| {
            Ok(StorageEvent {
                bucket: r.s3.bucket.name,
                key: decode_key(&r.s3.object.key)?,
                event_name: r.event_name,
            })
        })
        .collect()
}

/// Form-decode an object key: `+` becomes a space, `%XX` a byte.
///
/// A `%` not followed by two hex digits is kept literally.
pub fn decode_key(raw: &str) -> Result<String, PipelineError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8(out)
        .map_err(|_| PipelineError::InvalidEvent(format!("object key {raw:?} is not UTF-8 once decoded")))
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

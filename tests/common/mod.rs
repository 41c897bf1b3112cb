//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use slidepress::{CacheError, CacheInvalidator, Clock, MemoryStore, ObjectMeta, ObjectStore, StorageError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};

pub const BUCKET: &str = "decks";

// ── Tracing ──────────────────────────────────────────────────────────────────

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per binary. `RUST_LOG` overrides
/// the default `slidepress=debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slidepress=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ── Clock ────────────────────────────────────────────────────────────────────

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
}

pub fn fixed_clock(t: DateTime<Utc>) -> Clock {
    Arc::new(move || t)
}

// ── Recording store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Get(String),
    Put(String),
    List(String),
}

/// [`MemoryStore`] that records every call and can be told to fail
/// specific reads or writes.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    ops: Mutex<Vec<Op>>,
    fail_get: Mutex<HashSet<String>>,
    fail_put: Mutex<HashSet<String>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_get(&self, key: &str) {
        self.fail_get.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_put(&self, key: &str) {
        self.fail_put.lock().unwrap().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_get.lock().unwrap().clear();
        self.fail_put.lock().unwrap().clear();
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Keys of successful and attempted writes, in call order.
    pub fn puts(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Put(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn insert(&self, key: &str, body: impl Into<Vec<u8>>) {
        self.inner.insert(BUCKET, key, body);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(BUCKET, key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|b| String::from_utf8(b).unwrap())
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys(BUCKET)
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.ops.lock().unwrap().push(Op::Get(key.to_string()));
        if self.fail_get.lock().unwrap().contains(key) {
            return Err(StorageError::Backend(format!("injected read failure for {key}")));
        }
        self.inner.get_object(bucket, key).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        meta: &ObjectMeta,
    ) -> Result<(), StorageError> {
        self.ops.lock().unwrap().push(Op::Put(key.to_string()));
        if self.fail_put.lock().unwrap().contains(key) {
            return Err(StorageError::Backend(format!("injected write failure for {key}")));
        }
        self.inner.put_object(bucket, key, body, meta).await
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.ops.lock().unwrap().push(Op::List(prefix.to_string()));
        self.inner.list_objects(bucket, prefix).await
    }
}

// ── Fake cache ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationCall {
    pub distribution_id: String,
    pub paths: Vec<String>,
    pub caller_reference: String,
}

#[derive(Default)]
pub struct FakeInvalidator {
    calls: Mutex<Vec<InvalidationCall>>,
    reject: bool,
}

impl FakeInvalidator {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<InvalidationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for FakeInvalidator {
    async fn invalidate(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> Result<(), CacheError> {
        self.calls.lock().unwrap().push(InvalidationCall {
            distribution_id: distribution_id.to_string(),
            paths: paths.to_vec(),
            caller_reference: caller_reference.to_string(),
        });
        if self.reject {
            return Err(CacheError::Rejected {
                distribution_id: distribution_id.to_string(),
                reason: "TooManyInvalidationsInProgress".into(),
            });
        }
        Ok(())
    }
}

// ── Metadata fixtures ────────────────────────────────────────────────────────

pub fn metadata_json(base: &str, slides: u64, create_date: &str) -> String {
    serde_json::to_string_pretty(&serde_json::json!({
        "pdf_name": format!("{base}.pdf"),
        "original_name": format!("{base}.pptx"),
        "slide_count": slides,
        "create_date": create_date,
        "pdf_path": format!("pdfs/{base}.pdf"),
        "source_path": format!("pptxs/{base}.pptx"),
    }))
    .unwrap()
}

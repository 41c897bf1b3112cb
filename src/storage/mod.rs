//! Object-storage collaborator.
//!
//! ## Why a trait?
//!
//! Coordinators never talk to a storage service directly. They receive an
//! `Arc<dyn ObjectStore>` at construction, which keeps the pipeline free of
//! global clients and lets tests observe every read and write. Two
//! implementations ship with the crate: [`MemoryStore`] for tests and
//! embedding, [`LocalDirStore`] for running against a directory tree.

mod local;
mod memory;

pub use local::LocalDirStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use async_trait::async_trait;

/// Headers stored alongside an object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectMeta {
    pub content_type: String,
    pub cache_control: Option<String>,
}

impl ObjectMeta {
    pub fn pdf() -> Self {
        Self {
            content_type: "application/pdf".into(),
            cache_control: None,
        }
    }

    pub fn json() -> Self {
        Self {
            content_type: "application/json".into(),
            cache_control: None,
        }
    }

    pub fn html(cache_control: Option<String>) -> Self {
        Self {
            content_type: "text/html".into(),
            cache_control,
        }
    }

    pub fn text() -> Self {
        Self {
            content_type: "text/plain".into(),
            cache_control: None,
        }
    }
}

/// Narrow view of an object store: read, write, list.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full contents of `bucket/key`.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or overwrite `bucket/key`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        meta: &ObjectMeta,
    ) -> Result<(), StorageError>;

    /// Every key in `bucket` starting with `prefix`, sorted.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;
}

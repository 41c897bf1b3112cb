use super::{ObjectMeta, ObjectStore};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    meta: ObjectMeta,
}

/// In-process object store backed by a sorted map.
///
/// Cheap to construct; share it behind an `Arc` between coordinators.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the async interface.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                meta: ObjectMeta::default(),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    pub fn meta(&self, bucket: &str, key: &str) -> Option<ObjectMeta> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.meta.clone())
    }

    pub fn remove(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some()
    }

    /// All keys in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    // A panic while holding the lock cannot leave a half-written entry:
    // every mutation is a single map call.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(bucket, key).ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        meta: &ObjectMeta,
    ) -> Result<(), StorageError> {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_and_list_by_prefix() {
        let store = MemoryStore::new();
        store
            .put_object("b", "metadata/b.json", b"{}".to_vec(), &ObjectMeta::json())
            .await
            .unwrap();
        store.insert("b", "metadata/a.json", "{}");
        store.insert("b", "pdfs/a.pdf", "%PDF");
        store.insert("other", "metadata/c.json", "{}");

        let keys = store.list_objects("b", "metadata/").await.unwrap();
        assert_eq!(keys, vec!["metadata/a.json", "metadata/b.json"]);
        assert_eq!(store.meta("b", "metadata/b.json").unwrap().content_type, "application/json");
        assert_eq!(store.get_object("b", "pdfs/a.pdf").await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_object("b", "nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}

use super::{ObjectMeta, ObjectStore};
use crate::error::StorageError;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const TMP_SUFFIX: &str = ".slidepress-tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Object store over a directory tree: `bucket/key` maps to
/// `{root}/{bucket}/{key}`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a partial object. Object headers are not persisted.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(checked_relative(bucket, bucket, "")?);
        Ok(dir)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        Ok(self.bucket_dir(bucket)?.join(checked_relative(key, bucket, key)?))
    }
}

/// Reject empty, absolute and parent-relative names so a key can never
/// escape the bucket directory.
fn checked_relative(name: &str, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
    let path = Path::new(name);
    let clean = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if clean {
        Ok(path.to_path_buf())
    } else {
        Err(StorageError::Backend(format!(
            "invalid object name {name:?} (bucket {bucket:?}, key {key:?})"
        )))
    }
}

fn map_io(bucket: &str, key: &str, e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        io::ErrorKind::PermissionDenied => StorageError::AccessDenied {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        _ => StorageError::Io {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: e,
        },
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        tokio::fs::read(&path).await.map_err(|e| map_io(bucket, key, e))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _meta: &ObjectMeta,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(bucket, key, e))?;
        }

        // Atomic write: write to temp, then rename
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(
            ".{}{TMP_SUFFIX}",
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| map_io(bucket, key, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(map_io(bucket, key, e));
        }
        debug!("Wrote {} bytes to {}", body.len(), path.display());
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let mut keys = Vec::new();
        let mut pending = vec![(bucket_dir, String::new())];

        while let Some((dir, rel)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(map_io(bucket, &rel, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| map_io(bucket, &rel, e))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = format!("{rel}{name}");
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| map_io(bucket, &key, e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{key}/")));
                } else if !name.ends_with(TMP_SUFFIX) && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_is_atomic_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        store
            .put_object("b", "pdfs/deck.pdf", b"first".to_vec(), &ObjectMeta::pdf())
            .await
            .unwrap();
        store
            .put_object("b", "pdfs/deck.pdf", b"second".to_vec(), &ObjectMeta::pdf())
            .await
            .unwrap();

        assert_eq!(store.get_object("b", "pdfs/deck.pdf").await.unwrap(), b"second");
        let names: Vec<_> = std::fs::read_dir(dir.path().join("b/pdfs"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["deck.pdf"]);
    }

    #[tokio::test]
    async fn list_walks_nested_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        for key in ["metadata/z.json", "metadata/team/a.json", "metadata/b.json", "pdfs/b.pdf"] {
            store
                .put_object("b", key, b"{}".to_vec(), &ObjectMeta::json())
                .await
                .unwrap();
        }
        let keys = store.list_objects("b", "metadata/").await.unwrap();
        assert_eq!(keys, vec!["metadata/b.json", "metadata/team/a.json", "metadata/z.json"]);
        assert!(store.list_objects("missing", "").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_object_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        let err = store.get_object("b", "pptxs/none.pptx").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        let err = store
            .put_object("b", "../outside.txt", b"x".to_vec(), &ObjectMeta::text())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(store.get_object("b", "/etc/passwd").await.is_err());
    }
}

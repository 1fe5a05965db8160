//! Filesystem blob store for floor plans and photo artifacts.
//!
//! Blobs are addressed by deterministic keys, never URLs:
//! `{store_id}/floor-plan.jpg` for a store's floor plan and
//! `{store_id}/{location_id}/{kind}/{photo_id}.jpg` (plus `_thumb`) for
//! photos. Deleting a store or location is a prefix removal.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("storage error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn floor_plan_key(store_id: &str) -> String {
        format!("{}/floor-plan.jpg", store_id)
    }

    pub fn photo_key(store_id: &str, location_id: &str, kind: &str, photo_id: &str) -> String {
        format!("{}/{}/{}/{}.jpg", store_id, location_id, kind, photo_id)
    }

    pub fn photo_thumb_key(store_id: &str, location_id: &str, kind: &str, photo_id: &str) -> String {
        format!("{}/{}/{}/{}_thumb.jpg", store_id, location_id, kind, photo_id)
    }

    /// Absolute path of a blob, for readers that want the file directly.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Write a blob. The write goes to a temporary sibling first and is
    /// renamed into place so readers never observe a partial blob.
    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(key, e))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| StorageError::io(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(key, e))?;
        Ok(())
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(key);
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        fs::read(&path).map_err(|e| StorageError::io(key, e))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    /// Delete a blob. A missing blob is not an error.
    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    /// Remove every blob under a key prefix (a store or location subtree).
    /// Best-effort: a missing subtree counts as already removed.
    pub fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let path = self.root.join(prefix);
        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(prefix, e)),
        }
    }

    pub fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(".", e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path());
        (dir, blobs)
    }

    #[test]
    fn test_put_read_round_trip() {
        let (_dir, blobs) = store();
        let key = BlobStore::floor_plan_key("s1");
        blobs.put(&key, b"jpeg bytes").unwrap();
        assert_eq!(blobs.read(&key).unwrap(), b"jpeg bytes");
        assert!(blobs.exists(&key));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, blobs) = store();
        let err = blobs.read("s1/floor-plan.jpg").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, blobs) = store();
        let key = BlobStore::photo_key("s1", "l1", "audit", "p1");
        blobs.put(&key, b"x").unwrap();
        blobs.delete(&key).unwrap();
        blobs.delete(&key).unwrap();
        assert!(!blobs.exists(&key));
    }

    #[test]
    fn test_delete_prefix_removes_store_subtree() {
        let (_dir, blobs) = store();
        blobs.put(&BlobStore::floor_plan_key("s1"), b"a").unwrap();
        blobs
            .put(&BlobStore::photo_key("s1", "l1", "audit", "p1"), b"b")
            .unwrap();
        blobs
            .put(&BlobStore::photo_thumb_key("s1", "l1", "audit", "p1"), b"c")
            .unwrap();
        blobs.put(&BlobStore::floor_plan_key("s2"), b"d").unwrap();

        blobs.delete_prefix("s1").unwrap();
        assert!(!blobs.exists(&BlobStore::floor_plan_key("s1")));
        assert!(!blobs.exists(&BlobStore::photo_key("s1", "l1", "audit", "p1")));
        assert!(blobs.exists(&BlobStore::floor_plan_key("s2")));

        // Missing prefix is fine
        blobs.delete_prefix("s1").unwrap();
    }

    #[test]
    fn test_photo_keys_follow_convention() {
        assert_eq!(
            BlobStore::photo_key("s", "l", "install", "p"),
            "s/l/install/p.jpg"
        );
        assert_eq!(
            BlobStore::photo_thumb_key("s", "l", "install", "p"),
            "s/l/install/p_thumb.jpg"
        );
    }
}

//! Storage gateway — durable, owner-partitioned image storage.
//!
//! Objects live under `<root>/user_<owner>/<uuid>.<ext>` and are published
//! read-only under `/media/` by the HTTP server, so the public URL handed to
//! the extraction provider resolves back to the stored bytes. Names are
//! always fresh UUIDs: identical bytes stored twice yield two objects, and
//! callers must not assume dedup.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use super::validate::ImageKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid storage reference: {0}")]
    InvalidRef(String),
}

/// An object placed in the store: its public URL and the opaque reference
/// needed to delete it later.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub storage_ref: String,
}

/// On-disk object store rooted at a single directory.
pub struct ObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Write image bytes into the owner's partition.
    pub fn store(
        &self,
        owner_id: Uuid,
        bytes: &[u8],
        kind: ImageKind,
    ) -> Result<StoredImage, StorageError> {
        let partition = format!("user_{owner_id}");
        let object_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        let storage_ref = format!("{partition}/{object_name}");

        let dir = self.root.join(&partition);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&object_name), bytes)?;

        let url = format!("{}/media/{storage_ref}", self.public_base_url);
        Ok(StoredImage { url, storage_ref })
    }

    /// Remove a stored object by its reference.
    ///
    /// References come from our own database, but a traversal guard costs
    /// nothing: a ref must be a plain relative path inside the root.
    pub fn remove(&self, storage_ref: &str) -> Result<(), StorageError> {
        if storage_ref.starts_with('/') || storage_ref.split('/').any(|part| part == "..") {
            return Err(StorageError::InvalidRef(storage_ref.to_string()));
        }
        fs::remove_file(self.root.join(storage_ref))?;
        Ok(())
    }

    /// Whether an object currently exists for the given reference.
    pub fn contains(&self, storage_ref: &str) -> bool {
        self.root.join(storage_ref).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (ObjectStore, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(tmp.path().to_path_buf(), "http://localhost:3000");
        (store, tmp)
    }

    #[test]
    fn stores_under_owner_partition() {
        let (store, _tmp) = test_store();
        let owner = Uuid::new_v4();

        let stored = store.store(owner, b"\x89PNG\r\n\x1a\n", ImageKind::Png).unwrap();
        assert!(stored.storage_ref.starts_with(&format!("user_{owner}/")));
        assert!(stored.storage_ref.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("http://localhost:3000/media/{}", stored.storage_ref)
        );
        assert!(store.contains(&stored.storage_ref));
    }

    #[test]
    fn identical_bytes_get_distinct_objects() {
        let (store, _tmp) = test_store();
        let owner = Uuid::new_v4();

        let a = store.store(owner, b"\x89PNG\r\n\x1a\n", ImageKind::Png).unwrap();
        let b = store.store(owner, b"\x89PNG\r\n\x1a\n", ImageKind::Png).unwrap();
        assert_ne!(a.storage_ref, b.storage_ref);
        assert!(store.contains(&a.storage_ref));
        assert!(store.contains(&b.storage_ref));
    }

    #[test]
    fn different_owners_never_collide() {
        let (store, _tmp) = test_store();
        let a = store.store(Uuid::new_v4(), b"\xFF\xD8\xFF\xE0", ImageKind::Jpeg).unwrap();
        let b = store.store(Uuid::new_v4(), b"\xFF\xD8\xFF\xE0", ImageKind::Jpeg).unwrap();

        let partition = |r: &str| r.split('/').next().unwrap().to_string();
        assert_ne!(partition(&a.storage_ref), partition(&b.storage_ref));
    }

    #[test]
    fn remove_deletes_the_object() {
        let (store, _tmp) = test_store();
        let stored = store.store(Uuid::new_v4(), b"\x89PNG\r\n\x1a\n", ImageKind::Png).unwrap();

        store.remove(&stored.storage_ref).unwrap();
        assert!(!store.contains(&stored.storage_ref));
    }

    #[test]
    fn remove_rejects_traversal_refs() {
        let (store, _tmp) = test_store();
        assert!(matches!(
            store.remove("../outside.png"),
            Err(StorageError::InvalidRef(_))
        ));
        assert!(matches!(
            store.remove("/etc/passwd"),
            Err(StorageError::InvalidRef(_))
        ));
    }
}

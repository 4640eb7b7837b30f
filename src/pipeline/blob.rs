//! Blob store collaborator.
//!
//! The core addresses archives by opaque blob ids; mapping ids to actual
//! storage is the orchestration layer's business. [`FsBlobStore`] is the
//! filesystem implementation backing the CLI and tests.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::errors::{Error, Result};

/// Handle to a stored blob. Carries the byte length alongside the id so
/// callers never have to re-fetch just to size a blob.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub id: String,
    pub len: u64,
}

/// Narrow interface to whatever holds archive bytes.
pub trait BlobStore {
    /// Returns the full contents of the blob `id`.
    fn fetch(&self, id: &str) -> Result<Vec<u8>>;

    /// Persists `bytes` under a fresh id; `suggested_name` is a naming
    /// hint only.
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredBlob>;
}

/// Blob store over a local directory. Ids are file names.
pub struct FsBlobStore {
    root: PathBuf,
    next: AtomicU64,
}

impl FsBlobStore {
    /// Opens (or creates) a blob directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<FsBlobStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let existing = fs::read_dir(&root)?.count() as u64;
        Ok(FsBlobStore {
            root,
            next: AtomicU64::new(existing),
        })
    }

    fn checked_path(&self, id: &str) -> Result<PathBuf> {
        if id.contains('/') || id.contains('\\') || id.starts_with('.') {
            return Err(Error::Parameter(format!("malformed blob id '{}'", id)));
        }
        Ok(self.root.join(id))
    }
}

impl BlobStore for FsBlobStore {
    fn fetch(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.checked_path(id)?;
        fs::read(&path).map_err(|e| Error::Parameter(format!("unknown blob id '{}': {}", id, e)))
    }

    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredBlob> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let safe_name: String = suggested_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let id = format!("{:06}-{}", n, safe_name);
        fs::write(self.root.join(&id), bytes)?;
        debug!(id = %id, len = bytes.len(), "Blob stored");
        Ok(StoredBlob {
            id,
            len: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_fetch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();

        let blob = store.store(b"archive bytes", "feed.zip").unwrap();
        assert_eq!(blob.len, 13);

        let fetched = store.fetch(&blob.id).unwrap();
        assert_eq!(fetched, b"archive bytes");
    }

    #[test]
    fn test_ids_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        let a = store.store(b"a", "feed.zip").unwrap();
        let b = store.store(b"b", "feed.zip").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_unknown_id_is_a_parameter_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.fetch("000000-nope.zip"),
            Err(Error::Parameter(_))
        ));
    }

    #[test]
    fn test_traversal_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        assert!(store.fetch("../etc/passwd").is_err());
    }
}

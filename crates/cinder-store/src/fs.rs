//! Filesystem-backed blob store.
//!
//! One `<locator>.enc` file per document under a root directory. Blobs
//! hold only AEAD ciphertext, so the directory contents are useless
//! without the record store's key material.

use std::{
    io::{ErrorKind, Write},
    path::PathBuf,
};

use crate::{BlobStore, StorageError};

/// Blob store writing one ciphertext file per locator.
///
/// Clone is cheap (the root path is shared). Thread safety comes from
/// the operations themselves: puts are create-new (two concurrent puts
/// of one locator cannot both succeed) and deletes are idempotent.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a blob store rooted at `root`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self { root })
    }

    /// Resolve a locator to its backing file path.
    ///
    /// Locators are validated against the generation alphabet first so a
    /// corrupt or hostile locator can never name a path outside `root`.
    fn blob_path(&self, locator: &str) -> Result<PathBuf, StorageError> {
        let valid = !locator.is_empty()
            && locator.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

        if !valid {
            return Err(StorageError::InvalidLocator { locator: locator.to_string() });
        }

        Ok(self.root.join(format!("{locator}.enc")))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, locator: &str, ciphertext: &[u8]) -> Result<(), StorageError> {
        let path = self.blob_path(locator)?;

        // create_new makes the existence check and the create atomic.
        let result = std::fs::OpenOptions::new().write(true).create_new(true).open(&path);

        let mut file = match result {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict { locator: locator.to_string() });
            },
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        file.write_all(ciphertext).map_err(|e| StorageError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn get(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.blob_path(locator)?;

        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn delete(&self, locator: &str) -> Result<(), StorageError> {
        let path = self.blob_path(locator)?;

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn open_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("blobs").join("nested");

        let _store = FsBlobStore::open(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        store.put("loc-a", b"ciphertext bytes").unwrap();

        assert_eq!(store.get("loc-a").unwrap().unwrap(), b"ciphertext bytes");
    }

    #[test]
    fn put_rejects_existing_blob() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        store.put("loc-a", b"first").unwrap();

        match store.put("loc-a", b"second") {
            Err(StorageError::Conflict { locator }) => assert_eq!(locator, "loc-a"),
            other => panic!("Expected Conflict error, got: {other:?}"),
        }

        // First write wins; content untouched.
        assert_eq!(store.get("loc-a").unwrap().unwrap(), b"first");
    }

    #[test]
    fn get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        store.put("loc-a", b"bytes").unwrap();

        store.delete("loc-a").unwrap();
        store.delete("loc-a").unwrap();
        store.delete("never-existed").unwrap();

        assert!(store.get("loc-a").unwrap().is_none());
    }

    #[test]
    fn traversal_locators_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        for hostile in ["../escape", "a/b", "", ".", "loc\0"] {
            assert!(matches!(
                store.put(hostile, b"x"),
                Err(StorageError::InvalidLocator { .. })
            ));
            assert!(matches!(store.get(hostile), Err(StorageError::InvalidLocator { .. })));
            assert!(matches!(store.delete(hostile), Err(StorageError::InvalidLocator { .. })));
        }
    }

    #[test]
    fn blob_files_use_enc_suffix() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("blobs");
        let store = FsBlobStore::open(&root).unwrap();

        store.put("loc-a", b"bytes").unwrap();

        assert!(root.join("loc-a.enc").is_file());
    }
}

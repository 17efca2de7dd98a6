use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{BlobStore, ConsumeAttempt, RecordStore, StorageError, VaultRecord};

/// In-memory record store for testing and simulation
///
/// Uses a `HashMap` behind `Arc<Mutex<>>` to allow Clone and concurrent
/// access. The mutex doubles as the per-store critical section: holding
/// it across the read-modify-write in `try_consume` gives the atomicity
/// the trait demands. Uses `lock().expect()` which will panic if the
/// mutex is poisoned - acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, VaultRecord>>>,
}

impl MemoryRecordStore {
    /// Create a new empty `MemoryRecordStore`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    pub fn record_count(&self) -> usize {
        self.records.lock().expect("Mutex poisoned").len()
    }
}

impl RecordStore for MemoryRecordStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn insert(&self, record: &VaultRecord) -> Result<(), StorageError> {
        let mut records = self.records.lock().expect("Mutex poisoned");

        if records.contains_key(&record.locator) {
            return Err(StorageError::Conflict { locator: record.locator.clone() });
        }

        records.insert(record.locator.clone(), record.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn get(&self, locator: &str) -> Result<Option<VaultRecord>, StorageError> {
        let records = self.records.lock().expect("Mutex poisoned");
        Ok(records.get(locator).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn try_consume(&self, locator: &str) -> Result<ConsumeAttempt, StorageError> {
        let mut records = self.records.lock().expect("Mutex poisoned");

        let Some(record) = records.get_mut(locator) else {
            return Ok(ConsumeAttempt::Missing);
        };

        if record.is_exhausted() {
            return Ok(ConsumeAttempt::Exhausted);
        }

        record.uses_consumed += 1;
        debug_assert!(record.uses_consumed <= record.max_uses);

        Ok(ConsumeAttempt::Consumed(record.clone()))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn delete(&self, locator: &str) -> Result<bool, StorageError> {
        let mut records = self.records.lock().expect("Mutex poisoned");
        Ok(records.remove(locator).is_some())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn list_exhausted(&self) -> Result<Vec<VaultRecord>, StorageError> {
        let records = self.records.lock().expect("Mutex poisoned");
        Ok(records.values().filter(|r| r.is_exhausted() && !r.destroyed).cloned().collect())
    }
}

/// In-memory blob store for testing and simulation
///
/// Same `Arc<Mutex<HashMap>>` shape as [`MemoryRecordStore`], same
/// poisoned-mutex caveat.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Create a new empty `MemoryBlobStore`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().expect("Mutex poisoned").len()
    }
}

impl BlobStore for MemoryBlobStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn put(&self, locator: &str, ciphertext: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().expect("Mutex poisoned");

        if blobs.contains_key(locator) {
            return Err(StorageError::Conflict { locator: locator.to_string() });
        }

        blobs.insert(locator.to_string(), ciphertext.to_vec());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn get(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let blobs = self.blobs.lock().expect("Mutex poisoned");
        Ok(blobs.get(locator).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test code.
    #[allow(clippy::expect_used)]
    fn delete(&self, locator: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().expect("Mutex poisoned");
        blobs.remove(locator);
        Ok(())
    }
}

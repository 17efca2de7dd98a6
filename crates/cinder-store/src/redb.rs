//! Redb-backed durable record store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety.
//! Records survive restarts, and because Redb serializes write
//! transactions, the read-check-increment-write inside `try_consume` is
//! the atomic conditional update the [`RecordStore`] contract requires.

use std::{path::Path, sync::Arc};

use ::redb::{Database, ReadableTable, TableDefinition};

use crate::{ConsumeAttempt, RecordStore, StorageError, VaultRecord};

/// Table: records
/// Key: locator string
/// Value: CBOR-encoded `VaultRecord`
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Durable record store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbRecordStore {
    db: Arc<Database>,
}

impl RedbRecordStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the RECORDS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl RecordStore for RedbRecordStore {
    fn insert(&self, record: &VaultRecord) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;

            if table
                .get(record.locator.as_str())
                .map_err(|e| StorageError::Io(e.to_string()))?
                .is_some()
            {
                // Dropping the uncommitted transaction aborts it.
                return Err(StorageError::Conflict { locator: record.locator.clone() });
            }

            let bytes = encode_record(record)?;
            table
                .insert(record.locator.as_str(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn get(&self, locator: &str) -> Result<Option<VaultRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;

        match table.get(locator).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => Ok(Some(decode_record(value.value())?)),
            None => Ok(None),
        }
    }

    fn try_consume(&self, locator: &str) -> Result<ConsumeAttempt, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let attempt = {
            let mut table =
                txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;

            let current = match table.get(locator).map_err(|e| StorageError::Io(e.to_string()))? {
                Some(value) => Some(decode_record(value.value())?),
                None => None,
            };

            match current {
                None => ConsumeAttempt::Missing,
                Some(record) if record.is_exhausted() => ConsumeAttempt::Exhausted,
                Some(mut record) => {
                    record.uses_consumed += 1;
                    debug_assert!(record.uses_consumed <= record.max_uses);

                    let bytes = encode_record(&record)?;
                    table
                        .insert(locator, bytes.as_slice())
                        .map_err(|e| StorageError::Io(e.to_string()))?;

                    ConsumeAttempt::Consumed(record)
                },
            }
        };

        match attempt {
            ConsumeAttempt::Consumed(_) => {
                txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;
            },
            // Nothing was written; abort instead of paying a commit.
            ConsumeAttempt::Missing | ConsumeAttempt::Exhausted => drop(txn),
        }

        Ok(attempt)
    }

    fn delete(&self, locator: &str) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let removed;
        {
            let mut table =
                txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;

            // remove() of an absent key is a no-op, keeping delete idempotent.
            removed =
                table.remove(locator).map_err(|e| StorageError::Io(e.to_string()))?.is_some();
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(removed)
    }

    fn list_exhausted(&self) -> Result<Vec<VaultRecord>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut exhausted = Vec::new();

        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            let record = decode_record(value.value())?;

            if record.is_exhausted() && !record.destroyed {
                exhausted.push(record);
            }
        }

        Ok(exhausted)
    }
}

/// Encode a record as CBOR for storage.
fn encode_record(record: &VaultRecord) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Decode a stored CBOR record.
fn decode_record(bytes: &[u8]) -> Result<VaultRecord, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

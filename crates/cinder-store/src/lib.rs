//! Storage abstraction for the Cinder document vault
//!
//! Trait-based abstraction over two independent stores: the record store
//! (durable per-document metadata, keyed by locator) and the blob store
//! (ciphertext bytes, keyed by the same locator). Both traits are
//! synchronous (no async) to maintain a clean synchronous API design.
//!
//! The correctness-critical operation is [`RecordStore::try_consume`]:
//! a single atomic read-modify-write of the consumption counter.
//! Everything else is plain keyed reads, write-once inserts, and
//! idempotent deletes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod fs;
mod memory;
mod record;
mod redb;

pub use error::StorageError;
pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use record::VaultRecord;

pub use self::redb::RedbRecordStore;

/// Outcome of a [`RecordStore::try_consume`] attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeAttempt {
    /// The counter was incremented. Carries the post-increment record:
    /// `uses_consumed` reflects this consumption, and
    /// `uses_consumed == max_uses` means the caller is responsible for
    /// destroying the document.
    Consumed(VaultRecord),

    /// No record exists for this locator (never existed, or already
    /// destroyed).
    Missing,

    /// The record exists but `uses_consumed` had already reached
    /// `max_uses`. The counter was not modified.
    Exhausted,
}

/// Durable per-document metadata, keyed by locator.
///
/// Must be Clone (handles are shared across concurrent callers), Send +
/// Sync (thread-safe), and synchronous (no async methods).
/// Implementations typically share internal state via Arc, so clones
/// access the same underlying storage.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned (a thread panicked while holding a lock). Acceptable for
/// test/simulation code, but production implementations should avoid
/// poisonable locks.
pub trait RecordStore: Clone + Send + Sync + 'static {
    /// Insert a freshly registered record.
    ///
    /// # Invariants
    ///
    /// - Pre: the record's ciphertext is already in the blob store (a
    ///   visible record always has backing ciphertext)
    /// - Post: the record is durable and visible under its locator
    ///
    /// # Errors
    ///
    /// `StorageError::Conflict` if the locator already exists. Locators
    /// are generated with 96 bits of entropy, so a conflict indicates an
    /// entropy failure, not a retryable condition.
    fn insert(&self, record: &VaultRecord) -> Result<(), StorageError>;

    /// Load a record by locator. `None` if no record exists.
    fn get(&self, locator: &str) -> Result<Option<VaultRecord>, StorageError>;

    /// Atomically increment the consumption counter if the record is not
    /// yet exhausted.
    ///
    /// This is a single atomic read-modify-write: under arbitrary
    /// concurrent callers, exactly one may be the call that pushes
    /// `uses_consumed` to `max_uses`, and the counter never exceeds
    /// `max_uses`.
    fn try_consume(&self, locator: &str) -> Result<ConsumeAttempt, StorageError>;

    /// Delete a record, returning whether one was actually removed.
    /// Idempotent - deleting an absent locator is not an error, it just
    /// reports `false`.
    fn delete(&self, locator: &str) -> Result<bool, StorageError>;

    /// Snapshot of records with `uses_consumed >= max_uses` and
    /// `destroyed == false`.
    ///
    /// Used by the sweep pass. Finite, safe to re-run from scratch;
    /// records destroyed between the snapshot and their deletion are
    /// handled by the deletes being idempotent.
    fn list_exhausted(&self) -> Result<Vec<VaultRecord>, StorageError>;
}

/// Ciphertext bytes keyed by locator, write-once / delete-once.
///
/// Same Clone + Send + Sync + synchronous contract as [`RecordStore`].
pub trait BlobStore: Clone + Send + Sync + 'static {
    /// Store ciphertext for a locator.
    ///
    /// # Errors
    ///
    /// `StorageError::Conflict` if ciphertext already exists for this
    /// locator (blobs are write-once).
    fn put(&self, locator: &str, ciphertext: &[u8]) -> Result<(), StorageError>;

    /// Load ciphertext. `None` if no blob exists for this locator.
    fn get(&self, locator: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete ciphertext. Idempotent - deleting an absent blob is not an
    /// error.
    fn delete(&self, locator: &str) -> Result<(), StorageError>;
}

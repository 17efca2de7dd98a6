//! Storage error types.

use thiserror::Error;

/// Errors from record and blob store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Underlying I/O or database failure.
    ///
    /// May be transient (disk pressure) or permanent (corruption). The
    /// sweep pass retries destruction after these; other callers surface
    /// them.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored bytes could not be encoded or decoded.
    ///
    /// Fatal for the affected record - indicates on-disk corruption or a
    /// format bug.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Insert or put hit an already-occupied locator.
    ///
    /// Locators carry 96 bits of entropy; a conflict is an entropy or
    /// programming failure, never something end users should see.
    #[error("locator already exists: {locator}")]
    Conflict {
        /// Locator that collided.
        locator: String,
    },

    /// A locator failed validation before touching the backing medium.
    ///
    /// Blob stores reject locators outside the generation alphabet so a
    /// corrupt or hostile locator can never name a path outside the blob
    /// root.
    #[error("invalid locator: {locator}")]
    InvalidLocator {
        /// Offending locator.
        locator: String,
    },
}

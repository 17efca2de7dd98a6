//! Error taxonomy for vault operations.
//!
//! Strongly-typed errors for the four public operations. Each variant
//! documents whether a caller can usefully retry - the surrounding
//! UI/CLI layer maps these onto its own status codes.

use thiserror::Error;

use cinder_crypto::CryptoError;
use cinder_store::StorageError;

/// Errors that can occur during vault operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Registration parameters were malformed (e.g. `max_uses` of zero).
    /// The caller corrects its input and retries.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No document has ever existed under this locator. Reported to the
    /// caller, not retried.
    #[error("document not found")]
    NotFound,

    /// The document existed but is exhausted or destroyed. Deliberately
    /// identical whether caused by prior consumption or by losing a race
    /// to a concurrent consumer - both mean no further access.
    #[error("document is no longer available")]
    Gone,

    /// The document is secret-gated and no secret was supplied. The
    /// caller may retry with the secret.
    #[error("one-time secret required")]
    SecretRequired,

    /// The supplied secret failed verification. The caller may retry
    /// with the correct secret.
    #[error("invalid one-time secret")]
    InvalidSecret,

    /// Ciphertext was missing or failed authentication. Indicates
    /// storage corruption; not retried. The consumption counter is not
    /// charged for these.
    #[error("ciphertext integrity failure")]
    IntegrityFailure,

    /// A freshly generated locator collided with an existing one.
    /// Locators carry 96 bits of entropy, so this is treated as a fatal
    /// entropy/programming failure, never surfaced as a user category.
    #[error("locator collision: {0}")]
    Conflict(String),

    /// Storage backend failure (I/O, serialization). May be transient.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Secret hashing failed during registration. Indicates a bug.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl VaultError {
    /// Returns true if retrying the same call may succeed.
    ///
    /// Authentication failures are retryable with a corrected secret,
    /// input errors with corrected parameters, and storage errors may be
    /// transient. `NotFound`/`Gone` are final, and integrity or conflict
    /// failures indicate corruption or bugs that retries cannot fix.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::SecretRequired | Self::InvalidSecret | Self::Storage(_)
        )
    }
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::IntegrityFailure => Self::IntegrityFailure,
            CryptoError::Hash(msg) => Self::Crypto(msg),
        }
    }
}

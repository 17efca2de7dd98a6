//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors from sealing, opening and secret hashing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext failed authentication.
    ///
    /// The tag did not verify: the ciphertext is corrupt, truncated, or
    /// was sealed under a different key or nonce. No plaintext is ever
    /// returned in this case.
    #[error("ciphertext integrity failure")]
    IntegrityFailure,

    /// Hashing the one-time secret failed.
    ///
    /// Argon2id rejected its inputs (e.g. parameter or salt encoding
    /// problems). Indicates a bug rather than bad user input - secret
    /// *verification* never errors, it returns `false`.
    #[error("secret hashing failed: {0}")]
    Hash(String),
}

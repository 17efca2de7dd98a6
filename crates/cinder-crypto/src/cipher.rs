//! Document sealing using `XChaCha20-Poly1305`.
//!
//! One key and one nonce per document, generated fresh at registration.
//! Sealing is deterministic given identical inputs; opening fails closed
//! on any corruption or key/nonce mismatch.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{error::CryptoError, material::fill_random};

/// Key size in bytes (256-bit).
pub const KEY_SIZE: usize = 32;

/// Nonce size in bytes (192-bit, `XChaCha20`).
pub const NONCE_SIZE: usize = 24;

/// Symmetric key sealing exactly one document.
///
/// Zeroized on drop. The `Debug` impl is redacted so key bytes never
/// reach logs.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DocumentKey([u8; KEY_SIZE]);

impl DocumentKey {
    /// Generate a fresh key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        fill_random(&mut bytes);
        Self(bytes)
    }

    /// Reconstruct a key from stored bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, for persistence alongside the document record.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DocumentKey(..)")
    }
}

/// Nonce paired with exactly one [`DocumentKey`].
///
/// A (key, nonce) pair is used for a single seal operation; reuse across
/// two documents never happens because both are regenerated per
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentNonce([u8; NONCE_SIZE]);

impl DocumentNonce {
    /// Generate a fresh nonce from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        fill_random(&mut bytes);
        Self(bytes)
    }

    /// Reconstruct a nonce from stored bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw nonce bytes, for persistence alongside the document record.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Seal a document payload.
///
/// Returns ciphertext including the 16-byte Poly1305 tag. Deterministic
/// for identical (plaintext, key, nonce) inputs.
pub fn seal(plaintext: &[u8], key: &DocumentKey, nonce: &DocumentNonce) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Open a sealed document payload.
///
/// # Errors
///
/// - `IntegrityFailure`: the tag did not verify (corruption, truncation,
///   or wrong key/nonce). Fails closed - no partial plaintext.
pub fn open(
    ciphertext: &[u8],
    key: &DocumentKey,
    nonce: &DocumentNonce,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|_| CryptoError::IntegrityFailure)
}

//! One-time secret hashing and verification.
//!
//! Argon2id with the PHC string format. Deliberately expensive: the
//! secret space is only six digits, so the hash has to be slow enough
//! that offline brute force of a stolen record is impractical.

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString, rand_core::OsRng},
};

use crate::error::CryptoError;

/// Hash a one-time secret for storage.
///
/// Argon2id with default parameters and a fresh random 16-byte salt,
/// encoded as a PHC string (algorithm, parameters and salt travel with
/// the hash).
///
/// # Errors
///
/// - `Hash`: Argon2 rejected its inputs. Indicates a bug, not bad user
///   input.
pub fn hash_secret(secret: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| CryptoError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a supplied secret against a stored PHC hash.
///
/// Constant-time tag comparison inside the argon2 crate - no early-exit
/// timing signal. Returns `false` for any mismatch, including a stored
/// hash that fails to parse; verification never errors.
#[must_use]
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok()
}

//! Cinder Cryptographic Primitives
//!
//! Cryptographic building blocks for the Cinder document vault: AEAD
//! sealing of document payloads, CSPRNG generation of keys, nonces,
//! locators and one-time secrets, and slow hashing for secret
//! verification.
//!
//! # Key Lifecycle
//!
//! Every registered document gets a fresh random key and nonce:
//!
//! ```text
//! OS CSPRNG (getrandom)
//!        │
//!        ▼
//! DocumentKey + DocumentNonce (per document, never reused)
//!        │
//!        ▼
//! AEAD Sealing → Ciphertext (stored until consumption)
//! ```
//!
//! There is no key hierarchy or derivation. A key authorizes exactly one
//! document and dies with it when the document is destroyed.
//!
//! # Security
//!
//! Authenticity:
//! - XChaCha20-Poly1305 AEAD provides tamper-proof encryption
//! - Failed authentication tag -> `IntegrityFailure`, never garbage
//!   plaintext
//!
//! Randomness:
//! - All security-critical material (keys, nonces, locators, one-time
//!   secrets) comes from the OS CSPRNG, never a general-purpose RNG
//! - One-time secrets are rejection-sampled to stay uniform
//!
//! Secret verification:
//! - Argon2id with a random per-hash salt; deliberately expensive to
//!   resist brute force of the 6-digit secret space
//! - Verification is constant-time and returns `false` for any mismatch,
//!   including malformed stored hashes

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
mod error;
mod material;
mod secret;

pub use cipher::{DocumentKey, DocumentNonce, KEY_SIZE, NONCE_SIZE, open, seal};
pub use error::CryptoError;
pub use material::{LOCATOR_LEN, generate_locator, generate_one_time_secret};
pub use secret::{hash_secret, verify_secret};

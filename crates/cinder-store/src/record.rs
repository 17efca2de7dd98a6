//! The per-document metadata record.

use serde::{Deserialize, Serialize};

/// Metadata for one registered document.
///
/// Created once at registration; the only mutable field is
/// `uses_consumed`, and the only writer of it is
/// [`RecordStore::try_consume`](crate::RecordStore::try_consume).
/// Destruction removes the record entirely - there is no tombstone
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Unguessable identifier, unique across the store. Immutable.
    pub locator: String,
    /// Original file name, shown to recipients. Immutable.
    pub display_name: String,
    /// Plaintext size in bytes. Immutable.
    pub size: u64,
    /// Media type of the plaintext (e.g. `application/pdf`). Immutable.
    pub media_type: String,
    /// AEAD key bytes for this document. Never leaves the core.
    pub key: [u8; 32],
    /// AEAD nonce bytes paired with `key`. Never leaves the core.
    pub nonce: [u8; 24],
    /// Argon2id PHC hash of the one-time secret, present iff secret
    /// verification is required.
    pub secret_hash: Option<String>,
    /// Permitted consumptions. Immutable, >= 1.
    pub max_uses: u32,
    /// Consumptions so far. Monotonically non-decreasing, never exceeds
    /// `max_uses`.
    pub uses_consumed: u32,
    /// True once ciphertext deletion has begun. Terminal.
    pub destroyed: bool,
    /// Unix timestamp (seconds) of registration.
    pub created_at_secs: u64,
    /// Advisory absolute expiry (Unix seconds), independent of
    /// consumption.
    pub expires_at_secs: u64,
}

impl VaultRecord {
    /// Whether the consumption budget is spent.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.uses_consumed >= self.max_uses
    }

    /// Consumptions left before exhaustion.
    #[must_use]
    pub const fn uses_remaining(&self) -> u32 {
        self.max_uses.saturating_sub(self.uses_consumed)
    }

    /// Whether a one-time secret must be presented to consume this
    /// document.
    #[must_use]
    pub const fn requires_secret(&self) -> bool {
        self.secret_hash.is_some()
    }
}

//! The lifecycle controller.
//!
//! Orchestrates the cipher, secret verifier, record store and blob store
//! behind four operations: register, inspect, consume, sweep. Owns the
//! state machine per document:
//!
//! ```text
//! Active (uses_consumed < max_uses)
//!    │ consume
//!    ▼
//! Exhausted (uses_consumed == max_uses)
//!    │ destroy-on-exhaustion, or sweep after a crash
//!    ▼
//! Destroyed (record and ciphertext gone; terminal)
//! ```
//!
//! The only mutation in the system is the consumption counter, and the
//! only writer of it is [`RecordStore::try_consume`] - every other state
//! change is an idempotent delete.

use std::time::Duration;

use cinder_crypto::{DocumentKey, DocumentNonce};
use cinder_store::{BlobStore, ConsumeAttempt, RecordStore, StorageError, VaultRecord};

use crate::error::VaultError;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Advisory lifetime stamped on each record at registration. Expiry
    /// is reported to callers but does not trigger destruction.
    pub time_to_live: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { time_to_live: Duration::from_secs(24 * 60 * 60) }
    }
}

/// Registration parameters for one document.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// Name shown to recipients.
    pub display_name: String,
    /// Media type of the plaintext.
    pub media_type: String,
    /// Whether consumption requires a one-time secret.
    pub require_secret: bool,
    /// Permitted consumptions; must be >= 1.
    pub max_uses: u32,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Opaque locator naming the document. The only handle a recipient
    /// needs.
    pub locator: String,
    /// Plaintext one-time secret, present iff one was requested. Shown
    /// exactly once; only its hash is persisted.
    pub one_time_secret: Option<String>,
    /// Permitted consumptions, echoed back.
    pub max_uses: u32,
    /// Advisory expiry (Unix seconds).
    pub expires_at_secs: u64,
}

/// Read-only eligibility report for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    /// Name shown to recipients.
    pub display_name: String,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Media type of the plaintext.
    pub media_type: String,
    /// Whether consumption requires a one-time secret.
    pub requires_secret: bool,
    /// Consumptions so far.
    pub uses_consumed: u32,
    /// Permitted consumptions.
    pub max_uses: u32,
    /// Consumptions left.
    pub uses_remaining: u32,
    /// Advisory expiry (Unix seconds).
    pub expires_at_secs: u64,
}

/// A successfully consumed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedDocument {
    /// The decrypted payload.
    pub plaintext: Vec<u8>,
    /// Media type of the plaintext.
    pub media_type: String,
    /// Name shown to recipients.
    pub display_name: String,
    /// Consumptions including this one.
    pub uses_consumed: u32,
    /// Permitted consumptions.
    pub max_uses: u32,
    /// Consumptions left after this one.
    pub uses_remaining: u32,
}

/// Outcome of a sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Exhausted records this pass actually removed. A record destroyed
    /// concurrently by a consumer or another sweep is not claimed here.
    pub records_destroyed: usize,
}

/// The lifecycle controller.
///
/// Owns explicitly passed, lifetime-scoped store handles - no ambient
/// globals. Clone is cheap (store handles are Arc-backed) and clones
/// operate on the same underlying stores, which is how concurrent
/// callers share one vault.
#[derive(Clone)]
pub struct Vault<R: RecordStore, B: BlobStore> {
    records: R,
    blobs: B,
    config: VaultConfig,
}

impl<R: RecordStore, B: BlobStore> Vault<R, B> {
    /// Create a controller over the given stores.
    pub fn new(records: R, blobs: B, config: VaultConfig) -> Self {
        Self { records, blobs, config }
    }

    /// Encrypt and persist a document.
    ///
    /// Generates a fresh key, nonce and locator; seals the plaintext;
    /// writes ciphertext to the blob store *before* the record becomes
    /// visible (a partially registered document is never observable);
    /// and returns the locator plus the plaintext one-time secret, which
    /// is never stored in recoverable form.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `max_uses < 1`
    /// - `Conflict` if the generated locator collides (entropy failure)
    /// - `Storage` / `Crypto` on backend failures
    pub fn register(
        &self,
        plaintext: &[u8],
        request: &RegisterRequest,
    ) -> Result<Registration, VaultError> {
        if request.max_uses < 1 {
            return Err(VaultError::InvalidInput("max_uses must be at least 1".to_string()));
        }

        let locator = cinder_crypto::generate_locator();
        let key = DocumentKey::generate();
        let nonce = DocumentNonce::generate();
        let ciphertext = cinder_crypto::seal(plaintext, &key, &nonce);

        let (one_time_secret, secret_hash) = if request.require_secret {
            let secret = cinder_crypto::generate_one_time_secret();
            let hash = cinder_crypto::hash_secret(&secret)?;
            (Some(secret), Some(hash))
        } else {
            (None, None)
        };

        let created_at_secs = wall_clock_secs();
        let expires_at_secs = created_at_secs + self.config.time_to_live.as_secs();

        self.blobs.put(&locator, &ciphertext).map_err(conflict_is_fatal)?;

        let record = VaultRecord {
            locator: locator.clone(),
            display_name: request.display_name.clone(),
            size: plaintext.len() as u64,
            media_type: request.media_type.clone(),
            key: *key.as_bytes(),
            nonce: *nonce.as_bytes(),
            secret_hash,
            max_uses: request.max_uses,
            uses_consumed: 0,
            destroyed: false,
            created_at_secs,
            expires_at_secs,
        };

        if let Err(err) = self.records.insert(&record) {
            // The blob is already durable; remove it so a failed insert
            // doesn't leak ciphertext nobody can reach.
            if let Err(cleanup) = self.blobs.delete(&locator) {
                tracing::warn!(
                    locator = %locator,
                    error = %cleanup,
                    "orphaned ciphertext after failed insert"
                );
            }
            return Err(conflict_is_fatal(err));
        }

        tracing::info!(locator = %locator, max_uses = request.max_uses, "document registered");

        Ok(Registration {
            locator,
            one_time_secret,
            max_uses: request.max_uses,
            expires_at_secs,
        })
    }

    /// Read-only eligibility check.
    ///
    /// Performs the same checks as [`Vault::consume`] but never mutates
    /// the counter - safe to call any number of times.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record exists for the locator
    /// - `Gone` if the document is exhausted or destroyed
    /// - `SecretRequired` / `InvalidSecret` on secret gating failures
    pub fn inspect(
        &self,
        locator: &str,
        secret: Option<&str>,
    ) -> Result<InspectReport, VaultError> {
        let record = self.records.get(locator)?.ok_or(VaultError::NotFound)?;
        check_eligibility(&record, secret)?;

        Ok(InspectReport {
            display_name: record.display_name.clone(),
            size: record.size,
            media_type: record.media_type.clone(),
            requires_secret: record.requires_secret(),
            uses_consumed: record.uses_consumed,
            max_uses: record.max_uses,
            uses_remaining: record.uses_remaining(),
            expires_at_secs: record.expires_at_secs,
        })
    }

    /// Consume one use of a document, returning the decrypted plaintext.
    ///
    /// Ciphertext is fetched and decrypted *before* the atomic counter
    /// increment, so an integrity failure never charges the consumption
    /// budget, and the returned plaintext is computed from ciphertext
    /// read before any destruction. If this consumption is the one that
    /// reaches `max_uses`, ciphertext and record are destroyed
    /// synchronously; failures there are logged and left for the next
    /// sweep - they never fail the successful response.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no record exists for the locator
    /// - `Gone` if the document is exhausted, destroyed, or this call
    ///   lost the consume race
    /// - `SecretRequired` / `InvalidSecret` on secret gating failures
    /// - `IntegrityFailure` if ciphertext is missing or fails
    ///   authentication while the record is still live (the counter is
    ///   not charged)
    pub fn consume(
        &self,
        locator: &str,
        secret: Option<&str>,
    ) -> Result<ConsumedDocument, VaultError> {
        let record = self.records.get(locator)?.ok_or(VaultError::NotFound)?;
        check_eligibility(&record, secret)?;

        let Some(ciphertext) = self.blobs.get(locator)? else {
            if self.lost_destruction_race(locator)? {
                return Err(VaultError::Gone);
            }
            tracing::error!(locator, "record present but ciphertext missing");
            return Err(VaultError::IntegrityFailure);
        };

        let key = DocumentKey::from_bytes(record.key);
        let nonce = DocumentNonce::from_bytes(record.nonce);
        let plaintext = match cinder_crypto::open(&ciphertext, &key, &nonce) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                if self.lost_destruction_race(locator)? {
                    return Err(VaultError::Gone);
                }
                return Err(err.into());
            },
        };

        let updated = match self.records.try_consume(locator)? {
            ConsumeAttempt::Consumed(updated) => updated,
            // Lost the race to a concurrent consumer or a sweep. The
            // decrypted plaintext is discarded - no slot, no payload.
            ConsumeAttempt::Missing | ConsumeAttempt::Exhausted => {
                tracing::debug!(locator, "consume lost race; document gone");
                return Err(VaultError::Gone);
            },
        };

        tracing::debug!(
            locator,
            uses_consumed = updated.uses_consumed,
            max_uses = updated.max_uses,
            "document consumed"
        );

        if updated.is_exhausted() {
            self.destroy(locator);
        }

        let uses_remaining = updated.uses_remaining();
        Ok(ConsumedDocument {
            plaintext,
            media_type: updated.media_type,
            display_name: updated.display_name,
            uses_consumed: updated.uses_consumed,
            max_uses: updated.max_uses,
            uses_remaining,
        })
    }

    /// Reconciliation pass destroying every exhausted record.
    ///
    /// Covers crashes between a final increment and its destroy.
    /// Idempotent and safe to run concurrently with consume calls and
    /// with itself: every delete it performs is idempotent, and a record
    /// disappearing mid-sweep is not an error.
    ///
    /// # Errors
    ///
    /// - `Storage` if the exhausted-record scan itself fails. Per-record
    ///   deletion failures are logged and retried on the next pass
    ///   instead of failing the sweep.
    pub fn sweep(&self) -> Result<SweepReport, VaultError> {
        let exhausted = self.records.list_exhausted()?;
        let mut records_destroyed = 0;

        for record in &exhausted {
            if self.destroy(&record.locator) {
                records_destroyed += 1;
            }
        }

        if records_destroyed > 0 {
            tracing::info!(records_destroyed, "sweep pass complete");
        }

        Ok(SweepReport { records_destroyed })
    }

    /// Whether the locator's record is gone or exhausted on a fresh read.
    ///
    /// A consumer that read a live record can still lose the destruction
    /// race before reaching the ciphertext. Re-reading tells that race
    /// apart from genuine corruption: a record that is now absent or
    /// exhausted means this call simply lost, and the loser reports
    /// `Gone` like every other loser.
    fn lost_destruction_race(&self, locator: &str) -> Result<bool, VaultError> {
        let lost = match self.records.get(locator)? {
            None => true,
            Some(record) => record.destroyed || record.is_exhausted(),
        };

        if lost {
            tracing::debug!(locator, "consume lost destruction race");
        }
        Ok(lost)
    }

    /// Best-effort destruction: ciphertext first, then metadata.
    ///
    /// Never the reverse - a metadata-absent record pointing at live
    /// ciphertext would be a leak, while a blob-less record is picked up
    /// by the next sweep. Returns whether this call removed the record;
    /// a record already removed by a concurrent destroy is not claimed.
    fn destroy(&self, locator: &str) -> bool {
        if let Err(err) = self.blobs.delete(locator) {
            tracing::warn!(locator, error = %err, "ciphertext delete failed; sweep will retry");
            return false;
        }

        match self.records.delete(locator) {
            Ok(removed) => {
                if removed {
                    tracing::info!(locator, "document destroyed");
                }
                removed
            },
            Err(err) => {
                tracing::warn!(locator, error = %err, "record delete failed; sweep will retry");
                false
            },
        }
    }
}

/// Eligibility checks shared by inspect and consume.
///
/// Order matters: lifecycle state is checked before secret gating, so a
/// spent locator reports `Gone` rather than prompting for a secret.
fn check_eligibility(record: &VaultRecord, secret: Option<&str>) -> Result<(), VaultError> {
    if record.destroyed || record.is_exhausted() {
        return Err(VaultError::Gone);
    }

    if let Some(hash) = &record.secret_hash {
        let Some(secret) = secret else {
            return Err(VaultError::SecretRequired);
        };
        if !cinder_crypto::verify_secret(secret, hash) {
            return Err(VaultError::InvalidSecret);
        }
    }

    Ok(())
}

/// Map a storage conflict onto the fatal vault-level conflict.
///
/// Register is the only caller: a collision there means locator entropy
/// failed, which end users should never see as a normal error category.
fn conflict_is_fatal(err: StorageError) -> VaultError {
    match err {
        StorageError::Conflict { locator } => VaultError::Conflict(locator),
        other => VaultError::Storage(other),
    }
}

/// Current wall-clock time as Unix seconds.
///
/// # Panics
///
/// Panics if the system clock reports a time before the Unix epoch.
#[allow(clippy::expect_used)]
fn wall_clock_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("invariant: system clock is after Unix epoch (1970-01-01)")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use cinder_store::{MemoryBlobStore, MemoryRecordStore};

    use super::*;

    fn vault() -> Vault<MemoryRecordStore, MemoryBlobStore> {
        Vault::new(MemoryRecordStore::new(), MemoryBlobStore::new(), VaultConfig::default())
    }

    fn plain_request(max_uses: u32) -> RegisterRequest {
        RegisterRequest {
            display_name: "notes.txt".to_string(),
            media_type: "text/plain".to_string(),
            require_secret: false,
            max_uses,
        }
    }

    #[test]
    fn register_rejects_zero_max_uses() {
        let vault = vault();
        let result = vault.register(b"payload", &plain_request(0));
        assert!(matches!(result, Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn register_returns_locator_and_expiry() {
        let vault = vault();
        let registration = vault.register(b"payload", &plain_request(2)).unwrap();

        assert_eq!(registration.locator.len(), cinder_crypto::LOCATOR_LEN);
        assert_eq!(registration.max_uses, 2);
        assert!(registration.one_time_secret.is_none());
        assert!(registration.expires_at_secs > wall_clock_secs());
    }

    #[test]
    fn register_without_secret_stores_no_hash() {
        let vault = vault();
        let registration = vault.register(b"payload", &plain_request(1)).unwrap();

        let report = vault.inspect(&registration.locator, None).unwrap();
        assert!(!report.requires_secret);
    }

    #[test]
    fn register_with_secret_returns_six_digit_code() {
        let vault = vault();
        let request = RegisterRequest { require_secret: true, ..plain_request(1) };
        let registration = vault.register(b"payload", &request).unwrap();

        let secret = registration.one_time_secret.unwrap();
        assert_eq!(secret.len(), 6);
        assert!(secret.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn expiry_honors_configured_ttl() {
        let config = VaultConfig { time_to_live: Duration::from_secs(60) };
        let vault =
            Vault::new(MemoryRecordStore::new(), MemoryBlobStore::new(), config);

        let registration = vault.register(b"payload", &plain_request(1)).unwrap();

        let delta = registration.expires_at_secs - wall_clock_secs();
        assert!((55..=60).contains(&delta), "expiry should be ~60s out, was {delta}");
    }

    #[test]
    fn inspect_unknown_locator_is_not_found() {
        let vault = vault();
        assert_eq!(vault.inspect("absent-locator-xx", None), Err(VaultError::NotFound));
    }

    #[test]
    fn consume_unknown_locator_is_not_found() {
        let vault = vault();
        assert_eq!(
            vault.consume("absent-locator-xx", None).unwrap_err(),
            VaultError::NotFound
        );
    }

    #[test]
    fn tampered_ciphertext_surfaces_integrity_failure_without_charging() {
        let records = MemoryRecordStore::new();
        let blobs = MemoryBlobStore::new();
        let vault = Vault::new(records.clone(), blobs.clone(), VaultConfig::default());

        let registration = vault.register(b"payload", &plain_request(1)).unwrap();

        // Corrupt the stored ciphertext in place.
        let mut ciphertext = blobs.get(&registration.locator).unwrap().unwrap();
        ciphertext[0] ^= 0xFF;
        blobs.delete(&registration.locator).unwrap();
        blobs.put(&registration.locator, &ciphertext).unwrap();

        assert_eq!(
            vault.consume(&registration.locator, None).unwrap_err(),
            VaultError::IntegrityFailure
        );

        // The failed consume must not have charged the budget.
        let report = vault.inspect(&registration.locator, None).unwrap();
        assert_eq!(report.uses_consumed, 0);
    }

    #[test]
    fn missing_ciphertext_surfaces_integrity_failure() {
        let records = MemoryRecordStore::new();
        let blobs = MemoryBlobStore::new();
        let vault = Vault::new(records, blobs.clone(), VaultConfig::default());

        let registration = vault.register(b"payload", &plain_request(1)).unwrap();
        blobs.delete(&registration.locator).unwrap();

        assert_eq!(
            vault.consume(&registration.locator, None).unwrap_err(),
            VaultError::IntegrityFailure
        );
    }
}

//! End-to-end lifecycle tests over in-memory and durable stores.

use cinder_core::{RegisterRequest, Vault, VaultConfig, VaultError};
use cinder_store::{
    BlobStore, FsBlobStore, MemoryBlobStore, MemoryRecordStore, RecordStore, RedbRecordStore,
    VaultRecord,
};
use proptest::prelude::proptest;
use tempfile::tempdir;

fn memory_vault() -> Vault<MemoryRecordStore, MemoryBlobStore> {
    Vault::new(MemoryRecordStore::new(), MemoryBlobStore::new(), VaultConfig::default())
}

fn request(require_secret: bool, max_uses: u32) -> RegisterRequest {
    RegisterRequest {
        display_name: "report.pdf".to_string(),
        media_type: "application/pdf".to_string(),
        require_secret,
        max_uses,
    }
}

#[test]
fn single_use_scenario() {
    let vault = memory_vault();

    let registration = vault.register(b"hello", &request(false, 1)).unwrap();

    let consumed = vault.consume(&registration.locator, None).unwrap();
    assert_eq!(consumed.plaintext, b"hello");
    assert_eq!(consumed.uses_consumed, 1);
    assert_eq!(consumed.uses_remaining, 0);
    assert_eq!(consumed.display_name, "report.pdf");
    assert_eq!(consumed.media_type, "application/pdf");

    // The document is destroyed: any further access fails.
    let second = vault.consume(&registration.locator, None).unwrap_err();
    assert!(matches!(second, VaultError::Gone | VaultError::NotFound));
}

#[test]
fn exactly_n_consumes_succeed() {
    let vault = memory_vault();
    let registration = vault.register(b"payload bytes", &request(false, 3)).unwrap();

    for expected in 1..=3 {
        let consumed = vault.consume(&registration.locator, None).unwrap();
        assert_eq!(consumed.uses_consumed, expected);
        assert_eq!(consumed.uses_remaining, 3 - expected);
        assert_eq!(consumed.plaintext, b"payload bytes");
    }

    let fourth = vault.consume(&registration.locator, None).unwrap_err();
    assert!(matches!(fourth, VaultError::Gone | VaultError::NotFound));
}

#[test]
fn destruction_removes_record_and_ciphertext() {
    let records = MemoryRecordStore::new();
    let blobs = MemoryBlobStore::new();
    let vault = Vault::new(records.clone(), blobs.clone(), VaultConfig::default());

    let registration = vault.register(b"ephemeral", &request(false, 1)).unwrap();
    assert!(blobs.get(&registration.locator).unwrap().is_some());

    let _ = vault.consume(&registration.locator, None).unwrap();

    assert!(records.get(&registration.locator).unwrap().is_none());
    assert!(blobs.get(&registration.locator).unwrap().is_none());
    assert_eq!(vault.inspect(&registration.locator, None), Err(VaultError::NotFound));
}

#[test]
fn inspect_never_mutates() {
    let vault = memory_vault();
    let registration = vault.register(b"payload", &request(false, 2)).unwrap();

    for _ in 0..5 {
        let report = vault.inspect(&registration.locator, None).unwrap();
        assert_eq!(report.uses_consumed, 0);
        assert_eq!(report.uses_remaining, 2);
        assert_eq!(report.size, 7);
        assert_eq!(report.display_name, "report.pdf");
    }

    let _ = vault.consume(&registration.locator, None).unwrap();

    for _ in 0..5 {
        let report = vault.inspect(&registration.locator, None).unwrap();
        assert_eq!(report.uses_consumed, 1);
        assert_eq!(report.uses_remaining, 1);
    }
}

#[test]
fn secret_gating() {
    let vault = memory_vault();
    let registration = vault.register(b"guarded", &request(true, 2)).unwrap();
    let secret = registration.one_time_secret.clone().unwrap();

    // Missing secret.
    assert_eq!(
        vault.consume(&registration.locator, None).unwrap_err(),
        VaultError::SecretRequired
    );
    assert_eq!(vault.inspect(&registration.locator, None), Err(VaultError::SecretRequired));

    // Wrong secret.
    assert_eq!(
        vault.consume(&registration.locator, Some("000000")).unwrap_err(),
        VaultError::InvalidSecret
    );

    // Failed attempts never charge the budget.
    let report = vault.inspect(&registration.locator, Some(&secret)).unwrap();
    assert!(report.requires_secret);
    assert_eq!(report.uses_consumed, 0);

    // Correct secret.
    let consumed = vault.consume(&registration.locator, Some(&secret)).unwrap();
    assert_eq!(consumed.plaintext, b"guarded");
    assert_eq!(consumed.uses_consumed, 1);
}

#[test]
fn sweep_recovers_exhausted_but_undestroyed_records() {
    let records = MemoryRecordStore::new();
    let blobs = MemoryBlobStore::new();
    let vault = Vault::new(records.clone(), blobs.clone(), VaultConfig::default());

    // Simulate a crash between the final increment and the destroy:
    // an exhausted record whose ciphertext is still on disk.
    let crashed = VaultRecord {
        locator: "crashed-locator-x".to_string(),
        display_name: "orphan.bin".to_string(),
        size: 4,
        media_type: "application/octet-stream".to_string(),
        key: [3u8; 32],
        nonce: [4u8; 24],
        secret_hash: None,
        max_uses: 1,
        uses_consumed: 1,
        destroyed: false,
        created_at_secs: 1_700_000_000,
        expires_at_secs: 1_700_086_400,
    };
    records.insert(&crashed).unwrap();
    blobs.put("crashed-locator-x", b"left-over ciphertext").unwrap();

    // A live document must survive the sweep.
    let live = vault.register(b"still active", &request(false, 2)).unwrap();

    let report = vault.sweep().unwrap();
    assert_eq!(report.records_destroyed, 1);
    assert!(records.get("crashed-locator-x").unwrap().is_none());
    assert!(blobs.get("crashed-locator-x").unwrap().is_none());
    assert!(records.get(&live.locator).unwrap().is_some());

    // Idempotent: a second pass with no intervening consumption is a
    // no-op.
    let again = vault.sweep().unwrap();
    assert_eq!(again.records_destroyed, 0);

    // The live document is still fully consumable afterwards.
    let consumed = vault.consume(&live.locator, None).unwrap();
    assert_eq!(consumed.plaintext, b"still active");
}

#[test]
fn sweep_on_empty_vault_is_a_noop() {
    let vault = memory_vault();
    assert_eq!(vault.sweep().unwrap().records_destroyed, 0);
}

#[test]
fn durable_stores_full_lifecycle() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("vault.redb");
    let blobs = FsBlobStore::open(dir.path().join("blobs")).unwrap();

    // First "process": register and spend one of two uses. The store
    // handle is dropped at the end of the scope, releasing the database
    // (redb is single-open).
    let registration = {
        let records = RedbRecordStore::open(&db_path).unwrap();
        let vault = Vault::new(records, blobs.clone(), VaultConfig::default());

        let registration = vault.register(b"durable payload", &request(true, 2)).unwrap();

        // Blob exists on disk under the locator.
        assert!(
            dir.path().join("blobs").join(format!("{}.enc", registration.locator)).is_file()
        );

        let secret = registration.one_time_secret.clone().unwrap();
        let first = vault.consume(&registration.locator, Some(&secret)).unwrap();
        assert_eq!(first.plaintext, b"durable payload");
        assert_eq!(first.uses_remaining, 1);

        registration
    };

    // Second "process": the counter survived, and the final use
    // destroys both halves.
    let records = RedbRecordStore::open(&db_path).unwrap();
    assert_eq!(records.get(&registration.locator).unwrap().unwrap().uses_consumed, 1);

    let secret = registration.one_time_secret.clone().unwrap();
    let vault = Vault::new(records.clone(), blobs, VaultConfig::default());
    let last = vault.consume(&registration.locator, Some(&secret)).unwrap();
    assert_eq!(last.uses_remaining, 0);

    assert!(records.get(&registration.locator).unwrap().is_none());
    assert!(!dir.path().join("blobs").join(format!("{}.enc", registration.locator)).is_file());
}

#[test]
fn registrations_do_not_interfere() {
    let vault = memory_vault();

    let a = vault.register(b"document a", &request(false, 1)).unwrap();
    let b = vault.register(b"document b", &request(false, 1)).unwrap();
    assert_ne!(a.locator, b.locator);

    let consumed_a = vault.consume(&a.locator, None).unwrap();
    assert_eq!(consumed_a.plaintext, b"document a");

    // Consuming (and destroying) A leaves B untouched.
    let consumed_b = vault.consume(&b.locator, None).unwrap();
    assert_eq!(consumed_b.plaintext, b"document b");
}

proptest! {
    #[test]
    fn consumption_budget_is_exact(max_uses in 1u32..8, payload in proptest::collection::vec(
        proptest::prelude::any::<u8>(), 0..512,
    )) {
        let vault = memory_vault();
        let registration = vault.register(&payload, &request(false, max_uses)).unwrap();

        for _ in 0..max_uses {
            let consumed = vault.consume(&registration.locator, None).unwrap();
            assert_eq!(consumed.plaintext, payload);
        }

        let overdraw = vault.consume(&registration.locator, None).unwrap_err();
        assert!(matches!(overdraw, VaultError::Gone | VaultError::NotFound));
    }
}

//! Integration tests for the credential vault across keys and restarts.

use std::collections::HashSet;

use warden_core::{PrincipalId, WardenHome};
use warden_crypto::{Keyring, SealingKey};
use warden_test::{TestVault, test_keyring, test_principal, test_sealing_key};
use warden_vault::{CredentialVault, EncryptedRecord, VaultError};

#[test]
fn test_records_survive_reopen() {
    let tv = TestVault::new();
    let alice = test_principal();
    tv.vault.save(&alice, br#"{"access_token":"ya29.a0"}"#).unwrap();

    let reopened = tv.reopen(test_keyring());
    assert_eq!(
        &reopened.load(&alice).unwrap()[..],
        br#"{"access_token":"ya29.a0"}"#
    );
    assert_eq!(reopened.list_principals().unwrap(), vec![alice]);
}

#[test]
fn test_key_rotation_end_to_end() {
    let tv = TestVault::with_keyring(Keyring::new(test_sealing_key(1)));
    let principals: Vec<PrincipalId> = (0..4)
        .map(|i| PrincipalId::new(format!("user-{i}")))
        .collect();
    for p in &principals {
        tv.vault.save(p, p.as_str().as_bytes()).unwrap();
    }

    // New primary without the old key: nothing opens.
    let locked_out = tv.reopen(Keyring::new(test_sealing_key(2)));
    let err = locked_out.load(&principals[0]).unwrap_err();
    assert!(matches!(err, VaultError::Decryption { .. }));
    assert!(!err.requires_reauthentication());

    // New primary with the old key retired: everything opens and re-seals.
    let rotated = tv.reopen(Keyring::new(test_sealing_key(2)).with_retired(test_sealing_key(1)));
    assert_eq!(rotated.reencrypt_all().unwrap(), principals.len());

    // The old key is no longer needed.
    let fresh = tv.reopen(Keyring::new(test_sealing_key(2)));
    for p in &principals {
        assert_eq!(&fresh.load(p).unwrap()[..], p.as_str().as_bytes());
        let bytes = std::fs::read(fresh.record_path(p).unwrap()).unwrap();
        let record = EncryptedRecord::decode(&bytes).unwrap();
        assert_eq!(record.key_id, Some(test_sealing_key(2).key_id()));
    }
}

#[test]
fn test_record_swapped_between_principals_fails() {
    let tv = TestVault::new();
    let alice = PrincipalId::new("alice");
    let bob = PrincipalId::new("bob");
    tv.vault.save(&alice, b"alice-token").unwrap();
    tv.vault.save(&bob, b"bob-token").unwrap();

    std::fs::copy(
        tv.vault.record_path(&alice).unwrap(),
        tv.vault.record_path(&bob).unwrap(),
    )
    .unwrap();

    assert!(matches!(
        tv.vault.load(&bob).unwrap_err(),
        VaultError::Decryption { .. }
    ));
    assert_eq!(&tv.vault.load(&alice).unwrap()[..], b"alice-token");
}

#[test]
fn test_same_secret_distinct_ciphertexts() {
    let tv = TestVault::new();
    let a = PrincipalId::new("a");
    let b = PrincipalId::new("b");
    tv.vault.save(&a, b"same").unwrap();
    tv.vault.save(&b, b"same").unwrap();

    let read = |p: &PrincipalId| std::fs::read(tv.vault.record_path(p).unwrap()).unwrap();
    let ra = EncryptedRecord::decode(&read(&a)).unwrap();
    let rb = EncryptedRecord::decode(&read(&b)).unwrap();
    assert_ne!(ra.nonce, rb.nonce);
    assert_ne!(ra.ciphertext, rb.ciphertext);
}

#[test]
fn test_vault_under_warden_home() {
    let dir = tempfile::tempdir().unwrap();
    let home = WardenHome::from_path(dir.path().join(".warden"));
    home.ensure().unwrap();

    let key = SealingKey::load_or_generate(home.vault_key_path()).unwrap();
    let again = SealingKey::load_or_generate(home.vault_key_path()).unwrap();
    assert_eq!(key.key_id(), again.key_id());

    let vault = CredentialVault::open(home.vault_dir(), Keyring::new(key)).unwrap();
    let alice = test_principal();
    vault.save(&alice, b"refresh-token").unwrap();
    assert!(vault.exists(&alice).unwrap());
    assert!(vault.delete(&alice).unwrap());
    assert!(!vault.exists(&alice).unwrap());
}

#[test]
fn test_concurrent_principals() {
    let tv = std::sync::Arc::new(TestVault::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tv = std::sync::Arc::clone(&tv);
            std::thread::spawn(move || {
                let p = PrincipalId::new(format!("worker-{i}"));
                for round in 0..10 {
                    tv.vault.save(&p, format!("{i}:{round}").as_bytes()).unwrap();
                }
                p
            })
        })
        .collect();

    let saved: HashSet<PrincipalId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let listed: HashSet<PrincipalId> = tv.vault.list_principals().unwrap().into_iter().collect();
    assert_eq!(saved, listed);

    for p in &saved {
        let value = tv.vault.load(p).unwrap();
        assert!(std::str::from_utf8(&value).unwrap().ends_with(":9"));
    }
}

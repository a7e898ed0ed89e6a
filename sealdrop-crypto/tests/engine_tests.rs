mod support;

use pretty_assertions::assert_eq;
use sealdrop_crypto::{
    CipherSuite, CryptoError, EncryptedPayload, Engine, EngineConfig, IdentityPublicKey, Iv,
    KdfParams, OsProvider, SealedKeyFields, SealedPrivateKey, WrappedKey, cipher,
};
use std::sync::Arc;
use support::{PASSPHRASE, alice, bob, carol};

const WRONG_PASSPHRASE: &str = "correct-horse-battery-staple-quantum-ciphes";

fn fast_engine() -> Engine {
    let config = EngineConfig {
        modulus_bits: 2048,
        ..EngineConfig::default()
    };
    Engine::new(Arc::new(OsProvider), config).unwrap()
}

fn payload_of(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// The text columns a storage collaborator would keep for one user and one file.
struct PersistedRows {
    public_key: String,
    sealed: SealedKeyFields,
    ciphertext: String,
    iv: String,
    wrapped_key: String,
    checksum: String,
    cipher: String,
}

// ── End to end ──

#[tokio::test(flavor = "multi_thread")]
async fn full_lifecycle_with_default_config() {
    let engine = Engine::with_defaults();
    let plaintext = payload_of(10 * 1024 * 1024);

    let identity = engine.create_identity(PASSPHRASE).await.unwrap();
    assert_eq!(identity.public.modulus_bits(), 4096);

    let sealed_file = engine
        .encrypt_file(plaintext.clone(), &identity.public)
        .await
        .unwrap();
    assert_eq!(sealed_file.wrapped_key.len(), 512);
    assert_eq!(sealed_file.payload.ciphertext.len(), plaintext.len() + 16);

    let rows = PersistedRows {
        public_key: identity.public.to_text().unwrap(),
        sealed: identity.sealed.to_fields(),
        ciphertext: sealdrop_crypto::codec::encode(&sealed_file.payload.ciphertext),
        iv: sealed_file.payload.iv.to_text(),
        wrapped_key: sealed_file.wrapped_key.to_text(),
        checksum: sealed_file.checksum.to_hex(),
        cipher: sealed_file.cipher.to_string(),
    };
    drop(identity);
    drop(sealed_file);

    // Later, from storage only.
    let public = IdentityPublicKey::from_text(&rows.public_key).unwrap();
    assert_eq!(public.modulus_bits(), 4096);
    let sealed = SealedPrivateKey::from_fields(&rows.sealed).unwrap();
    let wrapped = WrappedKey::from_text(&rows.wrapped_key).unwrap();
    let suite: CipherSuite = rows.cipher.parse().unwrap();
    let payload = EncryptedPayload {
        ciphertext: sealdrop_crypto::codec::decode(&rows.ciphertext).unwrap(),
        iv: Iv::from_text(&rows.iv).unwrap(),
    };

    let recovered = engine
        .decrypt_file(&sealed, PASSPHRASE, &wrapped, suite, payload.clone())
        .await
        .unwrap();
    assert!(recovered == plaintext, "recovered bytes differ from original");
    assert_eq!(cipher::checksum(&recovered).to_hex(), rows.checksum);

    let err = engine
        .decrypt_file(&sealed, WRONG_PASSPHRASE, &wrapped, suite, payload)
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailure));
}

#[tokio::test]
async fn wrong_passphrase_fails_before_ciphertext_is_read() {
    let engine = fast_engine();
    let fixture = alice();

    // Neither the wrapped key nor the payload is valid; only the passphrase
    // check can be what fails.
    let garbage_wrapped = WrappedKey::from_bytes(vec![0u8; 3]);
    let garbage_payload = EncryptedPayload {
        ciphertext: vec![1, 2, 3],
        iv: Iv::from_bytes([0u8; 12]),
    };

    let err = engine
        .decrypt_file(
            &fixture.sealed,
            WRONG_PASSPHRASE,
            &garbage_wrapped,
            CipherSuite::Aes256Gcm,
            garbage_payload.clone(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailure));

    let err = engine
        .decrypt_file(
            &fixture.sealed,
            PASSPHRASE,
            &garbage_wrapped,
            CipherSuite::Aes256Gcm,
            garbage_payload,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::UnwrapFailure));
}

#[tokio::test]
async fn unwrap_then_decrypt_in_two_steps() {
    let engine = fast_engine();
    let fixture = alice();
    let plaintext = payload_of(2048);
    let sealed_file = engine
        .encrypt_file(plaintext.clone(), &fixture.public)
        .await
        .unwrap();

    assert!(matches!(
        engine
            .unwrap_file_key(&fixture.sealed, WRONG_PASSPHRASE, &sealed_file.wrapped_key)
            .await,
        Err(CryptoError::AuthenticationFailure)
    ));

    let key = engine
        .unwrap_file_key(&fixture.sealed, PASSPHRASE, &sealed_file.wrapped_key)
        .await
        .unwrap();
    let recovered = engine
        .decrypt_payload(sealed_file.cipher, sealed_file.payload, key)
        .await
        .unwrap();
    assert_eq!(recovered, plaintext);
}

#[tokio::test]
async fn tampered_ciphertext_is_integrity_failure() {
    let engine = fast_engine();
    let fixture = alice();
    let sealed_file = engine
        .encrypt_file(payload_of(4096), &fixture.public)
        .await
        .unwrap();

    let mut payload = sealed_file.payload.clone();
    payload.ciphertext[100] ^= 0x80;

    let err = engine
        .decrypt_file(
            &fixture.sealed,
            PASSPHRASE,
            &sealed_file.wrapped_key,
            sealed_file.cipher,
            payload,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::IntegrityFailure));
}

// ── Identity lifecycle ──

#[tokio::test]
async fn short_passphrase_rejected_at_setup() {
    let engine = fast_engine();
    let err = engine.create_identity("short").await.unwrap_err();
    assert!(matches!(err, CryptoError::InvalidParameters(_)));
}

#[tokio::test]
async fn verify_passphrase() {
    let engine = fast_engine();
    let fixture = alice();
    engine
        .verify_passphrase(&fixture.sealed, PASSPHRASE)
        .await
        .unwrap();
    assert!(matches!(
        engine.verify_passphrase(&fixture.sealed, WRONG_PASSPHRASE).await,
        Err(CryptoError::AuthenticationFailure)
    ));
}

#[tokio::test]
async fn change_passphrase_keeps_files_readable() {
    let engine = fast_engine();
    let fixture = alice();
    let plaintext = payload_of(777);
    let sealed_file = engine
        .encrypt_file(plaintext.clone(), &fixture.public)
        .await
        .unwrap();

    let new_passphrase = "brand-new-passphrase-after-rotation";
    let resealed = engine
        .change_passphrase(&fixture.sealed, PASSPHRASE, new_passphrase)
        .await
        .unwrap();
    assert_ne!(resealed.salt, fixture.sealed.salt);

    let recovered = engine
        .decrypt_file(
            &resealed,
            new_passphrase,
            &sealed_file.wrapped_key,
            sealed_file.cipher,
            sealed_file.payload.clone(),
        )
        .await
        .unwrap();
    assert_eq!(recovered, plaintext);

    assert!(matches!(
        engine
            .decrypt_file(
                &resealed,
                PASSPHRASE,
                &sealed_file.wrapped_key,
                sealed_file.cipher,
                sealed_file.payload,
            )
            .await,
        Err(CryptoError::AuthenticationFailure)
    ));
}

#[tokio::test]
async fn change_passphrase_validates_new_passphrase() {
    let engine = fast_engine();
    let err = engine
        .change_passphrase(&alice().sealed, PASSPHRASE, "tiny")
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::InvalidParameters(_)));
}

// ── Sharing ──

#[tokio::test]
async fn rewrap_for_two_recipients() {
    let engine = fast_engine();
    let owner = alice();
    let plaintext = b"shared design notes".to_vec();
    let sealed_file = engine
        .encrypt_file(plaintext.clone(), &owner.public)
        .await
        .unwrap();

    let wrapped = engine
        .rewrap_file_key(
            &owner.sealed,
            PASSPHRASE,
            &sealed_file.wrapped_key,
            &[bob().public.clone(), carol().public.clone()],
        )
        .await
        .unwrap();
    assert_eq!(wrapped.len(), 2);

    for (recipient, wrapped_key) in [bob(), carol()].into_iter().zip(&wrapped) {
        let recovered = engine
            .decrypt_file(
                &recipient.sealed,
                PASSPHRASE,
                wrapped_key,
                sealed_file.cipher,
                sealed_file.payload.clone(),
            )
            .await
            .unwrap();
        assert_eq!(recovered, plaintext);
    }

    // Bob's copy is not Carol's.
    assert!(matches!(
        engine
            .decrypt_file(
                &carol().sealed,
                PASSPHRASE,
                &wrapped[0],
                sealed_file.cipher,
                sealed_file.payload,
            )
            .await,
        Err(CryptoError::UnwrapFailure)
    ));
}

#[tokio::test]
async fn rewrap_requires_owner_passphrase() {
    let engine = fast_engine();
    let owner = alice();
    let sealed_file = engine
        .encrypt_file(vec![9; 32], &owner.public)
        .await
        .unwrap();
    let err = engine
        .rewrap_file_key(
            &owner.sealed,
            WRONG_PASSPHRASE,
            &sealed_file.wrapped_key,
            &[bob().public.clone()],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CryptoError::AuthenticationFailure));
}

// ── Concurrency ──

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_encrypts_are_independent() {
    let engine = fast_engine();
    let owner = alice().public.clone();

    let handles: Vec<_> = (0..8usize)
        .map(|i| {
            let engine = engine.clone();
            let owner = owner.clone();
            tokio::spawn(async move {
                let plaintext = payload_of(1024 + i);
                let sealed = engine.encrypt_file(plaintext.clone(), &owner).await?;
                Ok::<_, CryptoError>((plaintext, sealed))
            })
        })
        .collect();

    let mut ivs = std::collections::HashSet::new();
    for handle in handles {
        let (plaintext, sealed) = handle.await.unwrap().unwrap();
        assert!(ivs.insert(sealed.payload.iv));
        let recovered = engine
            .decrypt_file(
                &alice().sealed,
                PASSPHRASE,
                &sealed.wrapped_key,
                sealed.cipher,
                sealed.payload,
            )
            .await
            .unwrap();
        assert_eq!(recovered, plaintext);
    }
}

// ── Configuration ──

#[test]
fn engine_rejects_invalid_config() {
    let weak_kdf = EngineConfig {
        kdf: KdfParams::Pbkdf2Sha256 { iterations: 10 },
        ..EngineConfig::default()
    };
    assert!(Engine::new(Arc::new(OsProvider), weak_kdf).is_err());

    let small_modulus = EngineConfig {
        modulus_bits: 1024,
        ..EngineConfig::default()
    };
    assert!(Engine::new(Arc::new(OsProvider), small_modulus).is_err());
}

#[tokio::test]
async fn chacha_engine_roundtrip() {
    let config = EngineConfig {
        modulus_bits: 2048,
        cipher: CipherSuite::ChaCha20Poly1305,
        ..EngineConfig::default()
    };
    let engine = Engine::new(Arc::new(OsProvider), config).unwrap();
    let fixture = bob();
    let sealed_file = engine
        .encrypt_file(b"chacha".to_vec(), &fixture.public)
        .await
        .unwrap();
    assert_eq!(sealed_file.cipher, CipherSuite::ChaCha20Poly1305);

    let recovered = engine
        .decrypt_file(
            &fixture.sealed,
            PASSPHRASE,
            &sealed_file.wrapped_key,
            sealed_file.cipher,
            sealed_file.payload,
        )
        .await
        .unwrap();
    assert_eq!(recovered, b"chacha");
}

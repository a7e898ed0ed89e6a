//! Async façade over the envelope encryption primitives.
//!
//! Key generation, passphrase derivation, RSA and bulk AEAD are CPU-bound, so
//! each operation runs on the blocking pool and independent operations keep
//! progressing. The engine holds no secrets: every operation that needs the
//! private key takes the passphrase, unseals, uses the key and drops it
//! before returning.

use crate::cipher::{self, CipherSuite, Checksum, EncryptedPayload, FileKey};
use crate::config::EngineConfig;
use crate::error::{CryptoError, CryptoResult};
use crate::keypair::{IdentityKeypair, IdentityPublicKey};
use crate::provider::{CryptoProvider, OsProvider};
use crate::vault::{self, SealedPrivateKey};
use crate::wrap::{self, WrappedKey};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Output of account setup: the shareable public key and the sealed private key.
#[derive(Clone, Debug)]
pub struct IdentityBundle {
    pub public: IdentityPublicKey,
    pub sealed: SealedPrivateKey,
}

/// Everything produced by encrypting one file.
#[derive(Clone, Debug)]
pub struct SealedFile {
    pub payload: EncryptedPayload,
    /// File key wrapped under the owner's public key.
    pub wrapped_key: WrappedKey,
    /// Checksum of the plaintext.
    pub checksum: Checksum,
    pub cipher: CipherSuite,
}

/// Envelope encryption engine.
#[derive(Clone)]
pub struct Engine {
    provider: Arc<dyn CryptoProvider>,
    config: Arc<EngineConfig>,
}

impl Engine {
    pub fn new(provider: Arc<dyn CryptoProvider>, config: EngineConfig) -> CryptoResult<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            config: Arc::new(config),
        })
    }

    /// OS randomness and default configuration.
    pub fn with_defaults() -> Self {
        Self {
            provider: Arc::new(OsProvider),
            config: Arc::new(EngineConfig::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    async fn blocking<F, R>(&self, f: F) -> CryptoResult<R>
    where
        F: FnOnce(&dyn CryptoProvider, &EngineConfig) -> CryptoResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || f(provider.as_ref(), &config))
            .await
            .map_err(|e| CryptoError::Task(e.to_string()))?
    }

    /// Generates an identity and seals its private half under `passphrase`.
    pub async fn create_identity(&self, passphrase: &str) -> CryptoResult<IdentityBundle> {
        vault::validate_passphrase(passphrase, self.config.min_passphrase_len)?;
        let passphrase = Zeroizing::new(passphrase.to_owned());

        let bundle = self
            .blocking(move |provider, config| {
                let (public, private) =
                    IdentityKeypair::generate(provider, config.modulus_bits)?.into_parts();
                let sealed = vault::seal(provider, private, &passphrase, config.seal_algorithm())?;
                Ok(IdentityBundle { public, sealed })
            })
            .await?;

        debug!(
            "generated {}-bit identity sealed with {}",
            bundle.public.modulus_bits(),
            bundle.sealed.algorithm
        );
        Ok(bundle)
    }

    /// Checks a passphrase against a sealed key without using the key.
    pub async fn verify_passphrase(
        &self,
        sealed: &SealedPrivateKey,
        passphrase: &str,
    ) -> CryptoResult<()> {
        let sealed = sealed.clone();
        let passphrase = Zeroizing::new(passphrase.to_owned());
        self.blocking(move |provider, _| {
            vault::unseal(provider, &sealed, &passphrase).map(drop)
        })
        .await
    }

    /// Re-seals the private key under a new passphrase.
    ///
    /// Callers must not run two of these concurrently for the same account.
    pub async fn change_passphrase(
        &self,
        sealed: &SealedPrivateKey,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> CryptoResult<SealedPrivateKey> {
        vault::validate_passphrase(new_passphrase, self.config.min_passphrase_len)?;
        let sealed = sealed.clone();
        let old = Zeroizing::new(old_passphrase.to_owned());
        let new = Zeroizing::new(new_passphrase.to_owned());

        self.blocking(move |provider, config| {
            vault::reseal(provider, &sealed, &old, &new, config.seal_algorithm())
        })
        .await
    }

    /// Encrypts a file under a fresh one-time key wrapped for `owner`.
    ///
    /// The file key is dropped before this returns.
    pub async fn encrypt_file(
        &self,
        plaintext: Vec<u8>,
        owner: &IdentityPublicKey,
    ) -> CryptoResult<SealedFile> {
        let owner = owner.clone();
        let size = plaintext.len();

        let sealed = self
            .blocking(move |provider, config| {
                let checksum = Checksum::from_bytes(provider.digest(&plaintext));
                let key = FileKey::generate(provider);
                let payload = cipher::encrypt(provider, config.cipher, &plaintext, &key)?;
                let wrapped_key = wrap::wrap(provider, &key, &owner)?;
                Ok(SealedFile {
                    payload,
                    wrapped_key,
                    checksum,
                    cipher: config.cipher,
                })
            })
            .await?;

        debug!("encrypted {size} bytes with {}", sealed.cipher);
        Ok(sealed)
    }

    /// Unseals the private key and unwraps one file key with it.
    ///
    /// This is the passphrase gate: a wrong passphrase fails here with
    /// [`CryptoError::AuthenticationFailure`], so callers can run it before
    /// fetching any ciphertext.
    pub async fn unwrap_file_key(
        &self,
        sealed_key: &SealedPrivateKey,
        passphrase: &str,
        wrapped_key: &WrappedKey,
    ) -> CryptoResult<FileKey> {
        let sealed_key = sealed_key.clone();
        let wrapped_key = wrapped_key.clone();
        let passphrase = Zeroizing::new(passphrase.to_owned());

        self.blocking(move |provider, _| {
            vault::with_unsealed(provider, &sealed_key, &passphrase, |private| {
                wrap::unwrap(provider, &wrapped_key, private)
            })
        })
        .await
    }

    /// Decrypts a payload under an already unwrapped file key, consuming the key.
    pub async fn decrypt_payload(
        &self,
        suite: CipherSuite,
        payload: EncryptedPayload,
        key: FileKey,
    ) -> CryptoResult<Vec<u8>> {
        self.blocking(move |_, _| cipher::decrypt(suite, &payload.ciphertext, &key, &payload.iv))
            .await
    }

    /// Unseals, unwraps and decrypts one file.
    ///
    /// A wrong passphrase fails with [`CryptoError::AuthenticationFailure`]
    /// before the wrapped key or ciphertext is looked at.
    pub async fn decrypt_file(
        &self,
        sealed_key: &SealedPrivateKey,
        passphrase: &str,
        wrapped_key: &WrappedKey,
        suite: CipherSuite,
        payload: EncryptedPayload,
    ) -> CryptoResult<Vec<u8>> {
        let key = self
            .unwrap_file_key(sealed_key, passphrase, wrapped_key)
            .await?;
        self.decrypt_payload(suite, payload, key).await
    }

    /// Re-wraps a file key for each recipient.
    ///
    /// The owner's copy is unwrapped first with the owner's private key, then
    /// wrapped once per recipient. The file itself is not re-encrypted.
    pub async fn rewrap_file_key(
        &self,
        sealed_key: &SealedPrivateKey,
        passphrase: &str,
        own_wrapped: &WrappedKey,
        recipients: &[IdentityPublicKey],
    ) -> CryptoResult<Vec<WrappedKey>> {
        let sealed_key = sealed_key.clone();
        let own_wrapped = own_wrapped.clone();
        let recipients = recipients.to_vec();
        let passphrase = Zeroizing::new(passphrase.to_owned());

        let wrapped = self
            .blocking(move |provider, _| {
                let key = vault::with_unsealed(provider, &sealed_key, &passphrase, |private| {
                    wrap::unwrap(provider, &own_wrapped, private)
                })?;
                recipients
                    .iter()
                    .map(|recipient| wrap::wrap(provider, &key, recipient))
                    .collect::<CryptoResult<Vec<_>>>()
            })
            .await?;

        debug!("re-wrapped file key for {} recipient(s)", wrapped.len());
        Ok(wrapped)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish()
    }
}

//! Private-key vault: seals an identity's private key under a passphrase.
//!
//! Sealing derives a key from the passphrase and a fresh 16-byte salt, then
//! AEAD-encrypts the PKCS#8 encoding under a fresh 12-byte IV. The salt, IV
//! and algorithm tag travel with the ciphertext so the passphrase is the only
//! other input needed to unseal.
//!
//! This is the only path through which raw private key bytes leave memory.

use crate::cipher::{self, CipherSuite, Iv};
use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{KdfParams, SALT_SIZE, Salt};
use crate::keypair::IdentityPrivateKey;
use crate::provider::CryptoProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// KDF and AEAD used to seal a private key.
///
/// Text form: `<kdf-tag>/<cipher>`, e.g. `pbkdf2-sha256$i=100000/aes-256-gcm`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealAlgorithm {
    pub kdf: KdfParams,
    pub cipher: CipherSuite,
}

impl fmt::Display for SealAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kdf, self.cipher)
    }
}

impl FromStr for SealAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kdf, cipher) = s.rsplit_once('/').ok_or_else(|| {
            CryptoError::InvalidParameters(format!("unrecognized seal algorithm: {s}"))
        })?;
        Ok(Self {
            kdf: kdf.parse()?,
            cipher: cipher.parse()?,
        })
    }
}

/// A private key sealed under a passphrase-derived key.
///
/// Replaced wholesale on passphrase change, never edited in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPrivateKey {
    #[serde(with = "crate::codec::text")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::codec::text")]
    pub salt: [u8; SALT_SIZE],
    pub iv: Iv,
    pub algorithm: SealAlgorithm,
}

/// The four text columns a database stores for a sealed key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyFields {
    pub ciphertext: String,
    pub salt: String,
    pub iv: String,
    pub algorithm: String,
}

impl SealedPrivateKey {
    pub fn to_fields(&self) -> SealedKeyFields {
        SealedKeyFields {
            ciphertext: codec::encode(&self.ciphertext),
            salt: codec::encode(&self.salt),
            iv: self.iv.to_text(),
            algorithm: self.algorithm.to_string(),
        }
    }

    pub fn from_fields(fields: &SealedKeyFields) -> CryptoResult<Self> {
        Ok(Self {
            ciphertext: codec::decode(&fields.ciphertext)?,
            salt: codec::decode_array(&fields.salt)?,
            iv: Iv::from_text(&fields.iv)?,
            algorithm: fields.algorithm.parse()?,
        })
    }
}

/// Rejects blank passphrases and passphrases shorter than `min_len` characters.
pub fn validate_passphrase(passphrase: &str, min_len: usize) -> CryptoResult<()> {
    if passphrase.trim().is_empty() {
        return Err(CryptoError::InvalidParameters(
            "passphrase cannot be empty".to_string(),
        ));
    }
    let len = passphrase.chars().count();
    if len < min_len {
        return Err(CryptoError::InvalidParameters(format!(
            "passphrase must be at least {min_len} characters (got {len})"
        )));
    }
    Ok(())
}

/// Seals a private key, consuming it.
///
/// Draws a fresh salt and IV on every call. Nothing is persisted here.
pub fn seal(
    provider: &dyn CryptoProvider,
    private: IdentityPrivateKey,
    passphrase: &str,
    algorithm: SealAlgorithm,
) -> CryptoResult<SealedPrivateKey> {
    algorithm.kdf.validate()?;

    let salt = Salt::random(provider);
    let iv = Iv::random(provider);
    let derived = provider.derive_key(passphrase, &salt, &algorithm.kdf)?;

    let der = private.to_pkcs8_der()?;
    drop(private);
    let ciphertext = cipher::seal_raw(algorithm.cipher, derived.as_bytes(), &iv, &der)?;

    Ok(SealedPrivateKey {
        ciphertext,
        salt: *salt.as_bytes(),
        iv,
        algorithm,
    })
}

/// Unseals a private key.
///
/// A wrong passphrase is caught by the AEAD tag and reported as
/// [`CryptoError::AuthenticationFailure`]; it never yields a garbage key.
pub fn unseal(
    provider: &dyn CryptoProvider,
    sealed: &SealedPrivateKey,
    passphrase: &str,
) -> CryptoResult<IdentityPrivateKey> {
    let salt = Salt::from_bytes(sealed.salt);
    let derived = provider.derive_key(passphrase, &salt, &sealed.algorithm.kdf)?;

    let der = cipher::open_raw(
        sealed.algorithm.cipher,
        derived.as_bytes(),
        &sealed.iv,
        &sealed.ciphertext,
    )
    .map(Zeroizing::new)
    .map_err(|_| CryptoError::AuthenticationFailure)?;

    IdentityPrivateKey::from_pkcs8_der(&der)
}

/// Runs `f` with the unsealed private key and drops the key when `f` returns.
pub fn with_unsealed<R>(
    provider: &dyn CryptoProvider,
    sealed: &SealedPrivateKey,
    passphrase: &str,
    f: impl FnOnce(&IdentityPrivateKey) -> CryptoResult<R>,
) -> CryptoResult<R> {
    let private = unseal(provider, sealed, passphrase)?;
    f(&private)
}

/// Re-seals under a new passphrase with a fresh salt and IV.
///
/// Fails with [`CryptoError::AuthenticationFailure`] if `old_passphrase` is
/// wrong, leaving the caller's existing sealed key untouched.
pub fn reseal(
    provider: &dyn CryptoProvider,
    sealed: &SealedPrivateKey,
    old_passphrase: &str,
    new_passphrase: &str,
    algorithm: SealAlgorithm,
) -> CryptoResult<SealedPrivateKey> {
    let private = unseal(provider, sealed, old_passphrase)?;
    seal(provider, private, new_passphrase, algorithm)
}

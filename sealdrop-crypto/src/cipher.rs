//! File cipher: authenticated symmetric encryption of file payloads.
//!
//! Every payload is encrypted under a one-time [`FileKey`] with a fresh
//! 12-byte IV. The 16-byte tag is appended to the ciphertext. Decryption
//! failures of any kind surface as the single [`CryptoError::IntegrityFailure`].

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KEY_SIZE;
use crate::provider::CryptoProvider;
use aes_gcm::{Aes256Gcm, Key, Nonce};
use aes_gcm::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// IV (nonce) size in bytes.
pub const IV_SIZE: usize = 12;

/// Authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Checksum (SHA-256) size in bytes.
pub const CHECKSUM_SIZE: usize = 32;

/// AEAD construction. Both use a 256-bit key, 96-bit IV and 128-bit tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherSuite {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl CipherSuite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherSuite {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(CryptoError::InvalidParameters(format!(
                "unrecognized cipher suite: {other}"
            ))),
        }
    }
}

/// A per-encryption IV. Never reused with the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iv(#[serde(with = "crate::codec::text")] [u8; IV_SIZE]);

impl Iv {
    pub fn random(provider: &dyn CryptoProvider) -> Self {
        let mut bytes = [0u8; IV_SIZE];
        provider.fill_random(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    pub fn to_text(&self) -> String {
        codec::encode(&self.0)
    }

    pub fn from_text(text: &str) -> CryptoResult<Self> {
        codec::decode_array(text).map(Self)
    }
}

/// File Encryption Key: a one-time 256-bit key protecting a single file.
///
/// Not `Clone`; zeroized on drop. Only its wrapped form is ever persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct FileKey {
    bytes: [u8; KEY_SIZE],
}

impl FileKey {
    pub fn generate(provider: &dyn CryptoProvider) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        provider.fill_random(&mut bytes);
        let key = Self { bytes };
        bytes.zeroize();
        key
    }

    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Ciphertext (tag appended) plus the IV it was produced with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    #[serde(with = "crate::codec::text")]
    pub ciphertext: Vec<u8>,
    pub iv: Iv,
}

/// SHA-256 digest of a plaintext, kept for post-decrypt auditing.
///
/// Advisory only; the AEAD tag is what authenticates the ciphertext.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Checksum([u8; CHECKSUM_SIZE]);

impl Checksum {
    pub fn from_bytes(bytes: [u8; CHECKSUM_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> CryptoResult<Self> {
        let mut bytes = [0u8; CHECKSUM_SIZE];
        hex::decode_to_slice(text, &mut bytes).map_err(|_| CryptoError::MalformedEncoding)?;
        Ok(Self(bytes))
    }

    /// Whether `plaintext` hashes to this checksum.
    pub fn matches(&self, plaintext: &[u8]) -> bool {
        checksum(plaintext) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes the SHA-256 checksum of a plaintext.
pub fn checksum(plaintext: &[u8]) -> Checksum {
    let mut bytes = [0u8; CHECKSUM_SIZE];
    bytes.copy_from_slice(&Sha256::digest(plaintext));
    Checksum(bytes)
}

/// Encrypts a file payload under `key` with a freshly drawn IV.
pub fn encrypt(
    provider: &dyn CryptoProvider,
    suite: CipherSuite,
    plaintext: &[u8],
    key: &FileKey,
) -> CryptoResult<EncryptedPayload> {
    let iv = Iv::random(provider);
    let ciphertext = seal_raw(suite, key.as_bytes(), &iv, plaintext)?;
    Ok(EncryptedPayload { ciphertext, iv })
}

/// Decrypts a file payload.
///
/// Wrong key, wrong IV, flipped bits and truncation are all reported as
/// [`CryptoError::IntegrityFailure`].
pub fn decrypt(
    suite: CipherSuite,
    ciphertext: &[u8],
    key: &FileKey,
    iv: &Iv,
) -> CryptoResult<Vec<u8>> {
    open_raw(suite, key.as_bytes(), iv, ciphertext)
}

pub(crate) fn seal_raw(
    suite: CipherSuite,
    key: &[u8; KEY_SIZE],
    iv: &Iv,
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let nonce = Nonce::from_slice(iv.as_bytes());
    let result = match suite {
        CipherSuite::Aes256Gcm => {
            Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)).encrypt(nonce, plaintext)
        }
        CipherSuite::ChaCha20Poly1305 => {
            ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key)).encrypt(nonce, plaintext)
        }
    };
    result.map_err(|e| CryptoError::Encryption(format!("{suite} seal failed: {e}")))
}

pub(crate) fn open_raw(
    suite: CipherSuite,
    key: &[u8; KEY_SIZE],
    iv: &Iv,
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::IntegrityFailure);
    }

    let nonce = Nonce::from_slice(iv.as_bytes());
    let result = match suite {
        CipherSuite::Aes256Gcm => {
            Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)).decrypt(nonce, ciphertext)
        }
        CipherSuite::ChaCha20Poly1305 => {
            ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key)).decrypt(nonce, ciphertext)
        }
    };
    result.map_err(|_| CryptoError::IntegrityFailure)
}

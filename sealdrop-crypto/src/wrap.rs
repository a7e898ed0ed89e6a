//! Key wrapping: protects a file key under an identity's public key.
//!
//! RSA-OAEP with SHA-256. A wrapped key is exactly one modulus long. Sharing
//! a file with N recipients is N independent wraps of the same file key; the
//! file ciphertext is never touched.

use crate::cipher::FileKey;
use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KEY_SIZE;
use crate::keypair::{IdentityPrivateKey, IdentityPublicKey};
use crate::provider::CryptoProvider;
use rsa::Oaep;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

/// A file key wrapped under one recipient's public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedKey(#[serde(with = "crate::codec::text")] Vec<u8>);

impl WrappedKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_text(&self) -> String {
        codec::encode(&self.0)
    }

    pub fn from_text(text: &str) -> CryptoResult<Self> {
        codec::decode(text).map(Self)
    }
}

/// Wraps `key` under `recipient`.
pub fn wrap(
    provider: &dyn CryptoProvider,
    key: &FileKey,
    recipient: &IdentityPublicKey,
) -> CryptoResult<WrappedKey> {
    let mut rng = provider.rng();
    recipient
        .inner
        .encrypt(&mut rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map(WrappedKey)
        .map_err(|e| CryptoError::Encryption(format!("key wrap failed: {e}")))
}

/// Unwraps a file key.
///
/// Any failure (wrong private key, wrong length, flipped bits, a payload that
/// is not a 256-bit key) is reported as [`CryptoError::UnwrapFailure`].
pub fn unwrap(
    provider: &dyn CryptoProvider,
    wrapped: &WrappedKey,
    private: &IdentityPrivateKey,
) -> CryptoResult<FileKey> {
    if wrapped.len() != private.inner.size() {
        return Err(CryptoError::UnwrapFailure);
    }

    let mut rng = provider.rng();
    let plain = private
        .inner
        .decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), wrapped.as_bytes())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::UnwrapFailure)?;

    let mut bytes: [u8; KEY_SIZE] = plain
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::UnwrapFailure)?;
    let key = FileKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

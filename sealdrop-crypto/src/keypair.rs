//! Identity keypair management.
//!
//! Each user owns one RSA keypair. The public half is exported as SPKI DER
//! and shared freely; it can only wrap file keys. The private half can only
//! unwrap them, and its PKCS#8 encoding is reachable only from the vault.

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use zeroize::Zeroizing;

/// Modulus size used for new identities.
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Smallest modulus accepted for generation or import.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Public half of an identity. Usable only for wrapping.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityPublicKey {
    pub(crate) inner: RsaPublicKey,
}

impl IdentityPublicKey {
    /// Exports the key as SubjectPublicKeyInfo DER.
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        self.inner
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    /// Imports a SubjectPublicKeyInfo DER blob.
    ///
    /// Rejects garbage, non-RSA algorithms and undersized moduli with
    /// [`CryptoError::InvalidKeyFormat`].
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        check_modulus(inner.size() * 8)?;
        Ok(Self { inner })
    }

    pub fn to_text(&self) -> CryptoResult<String> {
        self.to_der().map(|der| codec::encode(&der))
    }

    pub fn from_text(text: &str) -> CryptoResult<Self> {
        Self::from_der(&codec::decode(text)?)
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// Size of a wrapped key produced under this public key.
    pub fn wrapped_len(&self) -> usize {
        self.inner.size()
    }

    /// Lowercase hex SHA-256 of the DER encoding.
    pub fn fingerprint(&self, provider: &dyn CryptoProvider) -> CryptoResult<String> {
        Ok(hex::encode(provider.digest(&self.to_der()?)))
    }
}

impl fmt::Debug for IdentityPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityPublicKey")
            .field("modulus_bits", &self.modulus_bits())
            .finish()
    }
}

/// Private half of an identity. Usable only for unwrapping.
///
/// Not `Clone` and not serializable. The underlying key zeroizes itself on
/// drop, so an unsealed key lives only as long as the operation holding it.
pub struct IdentityPrivateKey {
    pub(crate) inner: RsaPrivateKey,
}

impl IdentityPrivateKey {
    /// Derives the matching public key.
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey {
            inner: self.inner.to_public_key(),
        }
    }

    pub fn modulus_bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// PKCS#8 DER. Only the vault may call this.
    pub(crate) fn to_pkcs8_der(&self) -> CryptoResult<Zeroizing<Vec<u8>>> {
        self.inner
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }

    pub(crate) fn from_pkcs8_der(der: &[u8]) -> CryptoResult<Self> {
        let inner = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        check_modulus(inner.size() * 8)?;
        inner
            .validate()
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl fmt::Debug for IdentityPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityPrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A freshly generated identity.
#[derive(Debug)]
pub struct IdentityKeypair {
    pub public: IdentityPublicKey,
    pub private: IdentityPrivateKey,
}

impl IdentityKeypair {
    /// Generates a new RSA identity of `modulus_bits` bits.
    ///
    /// This is the slowest operation in the engine; async callers should go
    /// through [`crate::Engine`], which moves it off the executor.
    pub fn generate(provider: &dyn CryptoProvider, modulus_bits: usize) -> CryptoResult<Self> {
        if modulus_bits < MIN_MODULUS_BITS || modulus_bits % 8 != 0 {
            return Err(CryptoError::InvalidParameters(format!(
                "modulus must be a multiple of 8 and at least {MIN_MODULUS_BITS} bits, got {modulus_bits}"
            )));
        }
        let inner = provider.generate_rsa(modulus_bits)?;
        let private = IdentityPrivateKey { inner };
        Ok(Self {
            public: private.public_key(),
            private,
        })
    }

    pub fn into_parts(self) -> (IdentityPublicKey, IdentityPrivateKey) {
        (self.public, self.private)
    }
}

fn check_modulus(bits: usize) -> CryptoResult<()> {
    if bits < MIN_MODULUS_BITS {
        return Err(CryptoError::InvalidKeyFormat(format!(
            "modulus of {bits} bits is below the {MIN_MODULUS_BITS}-bit minimum"
        )));
    }
    Ok(())
}

//! Passphrase key derivation.
//!
//! The default is PBKDF2-HMAC-SHA256 at no fewer than 100 000 iterations.
//! Argon2id is accepted as a memory-hard alternative. Which one sealed a key
//! is recorded in the sealed key's algorithm tag, so both remain openable.

use crate::error::{CryptoError, CryptoResult};
use crate::provider::CryptoProvider;
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key size in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// Lowest PBKDF2 iteration count accepted for sealing.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Lowest Argon2id memory cost accepted for sealing, in KiB.
pub const MIN_ARGON2_MEMORY_KIB: u32 = 19_456;

/// Highest PBKDF2 iteration count accepted from a stored tag.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Highest Argon2id memory cost accepted from a stored tag, in KiB (1 GiB).
pub const MAX_ARGON2_MEMORY_KIB: u32 = 1024 * 1024;

/// Highest Argon2id pass count accepted from a stored tag.
pub const MAX_ARGON2_ITERATIONS: u32 = 64;

/// Highest Argon2id lane count accepted from a stored tag.
pub const MAX_ARGON2_PARALLELISM: u32 = 16;

/// A random per-seal salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Draws a fresh salt from the provider.
    pub fn random(provider: &dyn CryptoProvider) -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        provider.fill_random(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a salt from a slice, rejecting anything but 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SALT_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidSaltLength {
                    expected: SALT_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A 256-bit symmetric key derived from a passphrase.
///
/// Zeroized on drop; `Debug` never prints the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key derivation algorithm and its cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum KdfParams {
    Pbkdf2Sha256 {
        iterations: u32,
    },
    Argon2id {
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::Pbkdf2Sha256 {
            iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Argon2id with the OWASP baseline costs (19 MiB, 2 passes, 1 lane).
    pub fn argon2id() -> Self {
        Self::Argon2id {
            memory_kib: MIN_ARGON2_MEMORY_KIB,
            iterations: 2,
            parallelism: 1,
        }
    }

    /// Rejects parameters too weak to seal new keys with.
    pub fn validate(&self) -> CryptoResult<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } if iterations < MIN_PBKDF2_ITERATIONS => {
                Err(CryptoError::InvalidParameters(format!(
                    "pbkdf2 iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {iterations}"
                )))
            }
            Self::Argon2id { memory_kib, .. } if memory_kib < MIN_ARGON2_MEMORY_KIB => {
                Err(CryptoError::InvalidParameters(format!(
                    "argon2id memory must be at least {MIN_ARGON2_MEMORY_KIB} KiB, got {memory_kib}"
                )))
            }
            Self::Argon2id {
                iterations,
                parallelism,
                ..
            } if iterations == 0 || parallelism == 0 => Err(CryptoError::InvalidParameters(
                "argon2id iterations and parallelism must be non-zero".to_string(),
            )),
            _ => self.check_ceiling(),
        }
    }

    /// Rejects costs too large to run.
    ///
    /// Applied to every derivation, so a corrupted or hostile algorithm tag
    /// cannot pin the blocking pool or request gigabytes of memory.
    pub fn check_ceiling(&self) -> CryptoResult<()> {
        match *self {
            Self::Pbkdf2Sha256 { iterations } if iterations > MAX_PBKDF2_ITERATIONS => {
                Err(CryptoError::InvalidParameters(format!(
                    "pbkdf2 iterations must be at most {MAX_PBKDF2_ITERATIONS}, got {iterations}"
                )))
            }
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } if memory_kib > MAX_ARGON2_MEMORY_KIB
                || iterations > MAX_ARGON2_ITERATIONS
                || parallelism > MAX_ARGON2_PARALLELISM =>
            {
                Err(CryptoError::InvalidParameters(format!(
                    "argon2id costs exceed m={MAX_ARGON2_MEMORY_KIB},t={MAX_ARGON2_ITERATIONS},p={MAX_ARGON2_PARALLELISM}: {self}"
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for KdfParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbkdf2Sha256 { iterations } => write!(f, "pbkdf2-sha256$i={iterations}"),
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => write!(f, "argon2id$m={memory_kib},t={iterations},p={parallelism}"),
        }
    }
}

impl FromStr for KdfParams {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CryptoError::InvalidParameters(format!("unrecognized kdf tag: {s}"));
        let (name, params) = s.split_once('$').ok_or_else(invalid)?;

        let mut fields = std::collections::HashMap::new();
        for pair in params.split(',') {
            let (k, v) = pair.split_once('=').ok_or_else(invalid)?;
            let v: u32 = v.parse().map_err(|_| invalid())?;
            fields.insert(k, v);
        }
        let field = |k: &str| fields.get(k).copied().ok_or_else(invalid);

        match name {
            "pbkdf2-sha256" => Ok(Self::Pbkdf2Sha256 {
                iterations: field("i")?,
            }),
            "argon2id" => Ok(Self::Argon2id {
                memory_kib: field("m")?,
                iterations: field("t")?,
                parallelism: field("p")?,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Derives a 256-bit key from a passphrase and salt.
///
/// Deterministic for a given `(passphrase, salt, params)` triple. Parameters
/// are not checked against the sealing minimums here, so keys sealed under
/// older, weaker settings can still be opened. Costs above the ceilings are
/// refused with [`CryptoError::InvalidParameters`].
pub fn derive(passphrase: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<SymmetricKey> {
    params.check_ceiling()?;
    let mut out = [0u8; KEY_SIZE];

    match *params {
        KdfParams::Pbkdf2Sha256 { iterations } => {
            if iterations == 0 {
                return Err(CryptoError::InvalidParameters(
                    "pbkdf2 iterations must be non-zero".to_string(),
                ));
            }
            pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt.as_bytes(), iterations, &mut out);
        }
        KdfParams::Argon2id {
            memory_kib,
            iterations,
            parallelism,
        } => {
            let argon_params = Params::new(memory_kib, iterations, parallelism, Some(KEY_SIZE))
                .map_err(|e| CryptoError::InvalidParameters(format!("argon2id: {e}")))?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params)
                .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut out)
                .map_err(|e| CryptoError::InvalidParameters(format!("argon2id: {e}")))?;
        }
    }

    let key = SymmetricKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

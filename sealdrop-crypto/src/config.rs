//! Engine configuration.

use crate::cipher::CipherSuite;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;
use crate::keypair::{DEFAULT_MODULUS_BITS, MIN_MODULUS_BITS};
use crate::vault::{MIN_PASSPHRASE_LEN, SealAlgorithm};
use serde::{Deserialize, Serialize};

/// Tunables for the envelope encryption engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Passphrase KDF used when sealing new private keys.
    pub kdf: KdfParams,

    /// AEAD used for sealing private keys and encrypting files.
    pub cipher: CipherSuite,

    /// RSA modulus size for new identities.
    pub modulus_bits: usize,

    /// Minimum passphrase length in characters.
    pub min_passphrase_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            cipher: CipherSuite::default(),
            modulus_bits: DEFAULT_MODULUS_BITS,
            min_passphrase_len: MIN_PASSPHRASE_LEN,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> CryptoResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CryptoError::InvalidParameters(format!("engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CryptoResult<()> {
        self.kdf.validate()?;
        if self.modulus_bits < MIN_MODULUS_BITS || self.modulus_bits % 8 != 0 {
            return Err(CryptoError::InvalidParameters(format!(
                "modulus_bits must be a multiple of 8 and at least {MIN_MODULUS_BITS}, got {}",
                self.modulus_bits
            )));
        }
        if self.min_passphrase_len == 0 {
            return Err(CryptoError::InvalidParameters(
                "min_passphrase_len must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Algorithm tag applied to newly sealed keys.
    pub fn seal_algorithm(&self) -> SealAlgorithm {
        SealAlgorithm {
            kdf: self.kdf,
            cipher: self.cipher,
        }
    }
}

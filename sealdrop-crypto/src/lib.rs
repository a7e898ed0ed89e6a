//! Envelope encryption engine for sealdrop.
//!
//! Files are stored so that neither the storage backend nor the network ever
//! sees plaintext, and can be shared without re-uploading anything.
//!
//! # Architecture
//!
//! 1. **Identity keypair**: one RSA-4096 keypair per user. The public half is
//!    shared; the private half only exists sealed.
//!
//! 2. **Sealed private key**: the private half encrypted under a key derived
//!    from the user's passphrase (PBKDF2-SHA256 or Argon2id, then AES-256-GCM
//!    or ChaCha20-Poly1305). Unsealing is the only gate to file contents.
//!
//! 3. **File key**: a random one-time key per file, used to encrypt the file
//!    and then wrapped (RSA-OAEP-SHA256) under the owner's public key.
//!
//! Sharing wraps the same file key again under the recipient's public key;
//! the ciphertext is never re-encrypted or copied.
//!
//! Every binary artifact has a text form via [`codec`] so it can be stored in
//! text columns.

pub mod cipher;
pub mod codec;
pub mod config;
pub mod engine;
mod error;
pub mod kdf;
pub mod keypair;
pub mod provider;
pub mod vault;
pub mod wrap;

pub use cipher::{
    CipherSuite, Checksum, EncryptedPayload, FileKey, Iv, IV_SIZE, TAG_SIZE, checksum,
};
pub use config::EngineConfig;
pub use engine::{Engine, IdentityBundle, SealedFile};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{KEY_SIZE, KdfParams, SALT_SIZE, Salt, SymmetricKey};
pub use keypair::{IdentityKeypair, IdentityPrivateKey, IdentityPublicKey};
pub use provider::{CryptoProvider, OsProvider, ProviderRng, SeededProvider};
pub use vault::{SealAlgorithm, SealedKeyFields, SealedPrivateKey};
pub use wrap::WrappedKey;

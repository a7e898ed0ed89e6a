//! Crypto error types.
//!
//! None of these variants carry key material, passphrases or plaintext, and
//! none of them tell a wrong key apart from corrupted input.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the envelope encryption engine.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed encoding")]
    MalformedEncoding,

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("authentication failed (wrong passphrase or tampered key)")]
    AuthenticationFailure,

    #[error("integrity check failed (wrong key or tampered data)")]
    IntegrityFailure,

    #[error("key unwrap failed (wrong key or tampered data)")]
    UnwrapFailure,

    #[error("invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("background task failed: {0}")]
    Task(String),
}

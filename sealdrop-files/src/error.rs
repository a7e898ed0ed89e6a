//! Error types for the file workflows.

use sealdrop_crypto::CryptoError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for file workflow operations.
pub type FilesResult<T> = Result<T, FilesError>;

/// Errors that can occur while storing, sharing or retrieving files.
#[derive(Debug, Error)]
pub enum FilesError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("account keys already exist for user {0}")]
    AccountExists(String),

    #[error("no account keys for user {0}")]
    NoAccount(String),

    #[error("user {user} does not own file {file_id}")]
    NotOwner { user: String, file_id: Uuid },

    #[error("file {file_id} is not shared with user {user}")]
    NotShared { user: String, file_id: Uuid },

    #[error("invalid share recipient: {0}")]
    InvalidRecipient(String),

    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("checksum mismatch for file {0}")]
    ChecksumMismatch(Uuid),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilesError {
    /// True when the supplied passphrase did not unseal the account key.
    ///
    /// Lets callers prompt for re-entry without inspecting message text.
    pub fn is_wrong_passphrase(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::AuthenticationFailure))
    }
}

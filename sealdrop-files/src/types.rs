//! Records exchanged with the storage collaborators.
//!
//! Every binary artifact is held in its text form so records can be written
//! straight into text columns.

use chrono::{DateTime, Utc};
use sealdrop_crypto::{CipherSuite, SealedKeyFields};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's identity keys as persisted by the database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyRecord {
    pub user_id: String,
    /// SubjectPublicKeyInfo DER in codec text.
    pub public_key: String,
    pub sealed: SealedKeyFields,
    /// Hex SHA-256 of the public key DER.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for one stored file. The ciphertext lives in the blob store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedFileRecord {
    pub file_id: Uuid,
    pub owner_id: String,
    pub original_name: String,
    /// Plaintext size in bytes.
    pub size: u64,
    pub mime_type: String,
    /// File key wrapped under the owner's public key.
    pub wrapped_key: String,
    pub iv: String,
    pub cipher: CipherSuite,
    pub storage_path: String,
    /// Hex SHA-256 of the plaintext.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Grants one recipient access to one file through their own wrapped copy of
/// the file key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    pub share_id: Uuid,
    pub file_id: Uuid,
    pub owner_id: String,
    pub recipient_id: String,
    /// File key wrapped under the recipient's public key.
    pub wrapped_key: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShareGrant {
    /// Returns true if the grant carries an expiry at or before `now`.
    ///
    /// Informational only; downloads do not consult it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A plaintext file handed to `upload`.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// A file shared with the current user, with the grant that opens it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFile {
    pub file: EncryptedFileRecord,
    pub grant: ShareGrant,
}

/// Blob storage path for a file's ciphertext.
pub fn blob_storage_path(prefix: &str, owner_id: &str, file_id: Uuid) -> String {
    format!("{prefix}/{owner_id}/files/{file_id}.enc")
}

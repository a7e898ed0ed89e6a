//! Storage collaborators.
//!
//! The database and the object store are external systems; workflows reach
//! them only through these traits. Access policy (row-level security,
//! bucket ACLs) is the collaborator's job.

use crate::error::FilesResult;
use crate::types::{EncryptedFileRecord, ShareGrant, UserKeyRecord};
use async_trait::async_trait;
use uuid::Uuid;

/// Structured records: user keys, file metadata and share grants.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user_keys(&self, user_id: &str) -> FilesResult<Option<UserKeyRecord>>;

    /// Inserts or replaces a user's key record.
    async fn put_user_keys(&self, record: UserKeyRecord) -> FilesResult<()>;

    /// Fails if a record with the same id already exists.
    async fn insert_file(&self, record: EncryptedFileRecord) -> FilesResult<()>;

    async fn get_file(&self, file_id: Uuid) -> FilesResult<Option<EncryptedFileRecord>>;

    /// Files owned by `owner_id`, oldest first.
    async fn list_files(&self, owner_id: &str) -> FilesResult<Vec<EncryptedFileRecord>>;

    /// Returns false if there was nothing to delete.
    async fn delete_file(&self, file_id: Uuid) -> FilesResult<bool>;

    async fn insert_share(&self, grant: ShareGrant) -> FilesResult<()>;

    async fn get_share(&self, share_id: Uuid) -> FilesResult<Option<ShareGrant>>;

    async fn shares_for_file(&self, file_id: Uuid) -> FilesResult<Vec<ShareGrant>>;

    async fn shares_for_recipient(&self, recipient_id: &str) -> FilesResult<Vec<ShareGrant>>;

    async fn delete_share(&self, share_id: Uuid) -> FilesResult<bool>;

    /// Returns the number of grants removed.
    async fn delete_shares_for_file(&self, file_id: Uuid) -> FilesResult<usize>;
}

/// Opaque ciphertext storage addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> FilesResult<()>;

    /// Fails with `NotFound` if nothing is stored at `path`.
    async fn get(&self, path: &str) -> FilesResult<Vec<u8>>;

    /// Returns false if there was nothing to delete.
    async fn delete(&self, path: &str) -> FilesResult<bool>;
}

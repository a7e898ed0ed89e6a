//! In-memory storage collaborators for tests and local runs.

use crate::error::{FilesError, FilesResult};
use crate::store::{BlobStore, RecordStore};
use crate::types::{EncryptedFileRecord, ShareGrant, UserKeyRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory record store.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    users: Arc<RwLock<HashMap<String, UserKeyRecord>>>,
    files: Arc<RwLock<HashMap<Uuid, EncryptedFileRecord>>>,
    shares: Arc<RwLock<HashMap<Uuid, ShareGrant>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn share_count(&self) -> usize {
        self.shares.read().await.len()
    }
}

fn sorted_shares(mut grants: Vec<ShareGrant>) -> Vec<ShareGrant> {
    grants.sort_by_key(|g| (g.created_at, g.share_id));
    grants
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_user_keys(&self, user_id: &str) -> FilesResult<Option<UserKeyRecord>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn put_user_keys(&self, record: UserKeyRecord) -> FilesResult<()> {
        self.users
            .write()
            .await
            .insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn insert_file(&self, record: EncryptedFileRecord) -> FilesResult<()> {
        match self.files.write().await.entry(record.file_id) {
            Entry::Occupied(_) => Err(FilesError::Storage(format!(
                "file record {} already exists",
                record.file_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get_file(&self, file_id: Uuid) -> FilesResult<Option<EncryptedFileRecord>> {
        Ok(self.files.read().await.get(&file_id).cloned())
    }

    async fn list_files(&self, owner_id: &str) -> FilesResult<Vec<EncryptedFileRecord>> {
        let mut files: Vec<_> = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.owner_id == owner_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| (f.created_at, f.file_id));
        Ok(files)
    }

    async fn delete_file(&self, file_id: Uuid) -> FilesResult<bool> {
        Ok(self.files.write().await.remove(&file_id).is_some())
    }

    async fn insert_share(&self, grant: ShareGrant) -> FilesResult<()> {
        match self.shares.write().await.entry(grant.share_id) {
            Entry::Occupied(_) => Err(FilesError::Storage(format!(
                "share grant {} already exists",
                grant.share_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(grant);
                Ok(())
            }
        }
    }

    async fn get_share(&self, share_id: Uuid) -> FilesResult<Option<ShareGrant>> {
        Ok(self.shares.read().await.get(&share_id).cloned())
    }

    async fn shares_for_file(&self, file_id: Uuid) -> FilesResult<Vec<ShareGrant>> {
        let grants = self
            .shares
            .read()
            .await
            .values()
            .filter(|g| g.file_id == file_id)
            .cloned()
            .collect();
        Ok(sorted_shares(grants))
    }

    async fn shares_for_recipient(&self, recipient_id: &str) -> FilesResult<Vec<ShareGrant>> {
        let grants = self
            .shares
            .read()
            .await
            .values()
            .filter(|g| g.recipient_id == recipient_id)
            .cloned()
            .collect();
        Ok(sorted_shares(grants))
    }

    async fn delete_share(&self, share_id: Uuid) -> FilesResult<bool> {
        Ok(self.shares.write().await.remove(&share_id).is_some())
    }

    async fn delete_shares_for_file(&self, file_id: Uuid) -> FilesResult<usize> {
        let mut shares = self.shares.write().await;
        let before = shares.len();
        shares.retain(|_, g| g.file_id != file_id);
        Ok(before - shares.len())
    }
}

/// Thread-safe in-memory blob store.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> FilesResult<()> {
        self.blobs.write().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> FilesResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| FilesError::NotFound(format!("blob {path}")))
    }

    async fn delete(&self, path: &str) -> FilesResult<bool> {
        Ok(self.blobs.write().await.remove(path).is_some())
    }
}

//! Upload, download and delete of encrypted files.
//!
//! The blob store only ever receives ciphertext. Each file gets its own
//! one-time key, wrapped for the owner and stored on the file record.

use crate::accounts::AccountManager;
use crate::config::FilesConfig;
use crate::error::{FilesError, FilesResult};
use crate::store::{BlobStore, RecordStore};
use crate::types::{EncryptedFileRecord, FileUpload, blob_storage_path};
use chrono::Utc;
use sealdrop_crypto::{Checksum, EncryptedPayload, Engine, Iv, WrappedKey};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stores, retrieves and deletes encrypted files.
#[derive(Clone)]
pub struct FileManager {
    engine: Engine,
    accounts: AccountManager,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    config: Arc<FilesConfig>,
}

impl FileManager {
    pub fn new(
        engine: Engine,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        config: Arc<FilesConfig>,
    ) -> Self {
        Self {
            accounts: AccountManager::new(engine.clone(), Arc::clone(&records)),
            engine,
            records,
            blobs,
            config,
        }
    }

    /// Encrypts `upload` for `owner_id` and stores ciphertext and metadata.
    ///
    /// If the record cannot be written the uploaded blob is removed again.
    pub async fn upload(
        &self,
        owner_id: &str,
        upload: FileUpload,
    ) -> FilesResult<EncryptedFileRecord> {
        let size = upload.bytes.len() as u64;
        let limit = self.config.max_file_size_bytes;
        if size > limit {
            return Err(FilesError::FileTooLarge { size, limit });
        }

        let owner_key = self.accounts.public_key(owner_id).await?;
        let sealed = self.engine.encrypt_file(upload.bytes, &owner_key).await?;

        let file_id = Uuid::now_v7();
        let storage_path = blob_storage_path(&self.config.storage_prefix, owner_id, file_id);
        let record = EncryptedFileRecord {
            file_id,
            owner_id: owner_id.to_string(),
            original_name: upload.original_name,
            size,
            mime_type: upload.mime_type,
            wrapped_key: sealed.wrapped_key.to_text(),
            iv: sealed.payload.iv.to_text(),
            cipher: sealed.cipher,
            storage_path: storage_path.clone(),
            checksum: sealed.checksum.to_hex(),
            created_at: Utc::now(),
        };

        self.blobs.put(&storage_path, sealed.payload.ciphertext).await?;
        if let Err(e) = self.records.insert_file(record.clone()).await {
            warn!("record insert failed for file {file_id}, removing uploaded blob: {e}");
            if let Err(cleanup) = self.blobs.delete(&storage_path).await {
                warn!("failed to remove orphaned blob {storage_path}: {cleanup}");
            }
            return Err(e);
        }

        info!("uploaded file {file_id} ({size} bytes) for user {owner_id}");
        Ok(record)
    }

    /// Decrypts a file for its owner or for a user it was shared with.
    ///
    /// A wrong passphrase fails before the ciphertext is fetched; see
    /// [`FilesError::is_wrong_passphrase`].
    pub async fn download(
        &self,
        user_id: &str,
        file_id: Uuid,
        passphrase: &str,
    ) -> FilesResult<Vec<u8>> {
        let record = self.file(file_id).await?;
        let wrapped_key = self.wrapped_key_for(user_id, &record).await?;
        let sealed_key = self.accounts.sealed_key(user_id).await?;
        let expected = Checksum::from_hex(&record.checksum)?;
        let iv = Iv::from_text(&record.iv)?;

        // Unseal and unwrap first; the blob is fetched only once the
        // passphrase has opened the key.
        let key = self
            .engine
            .unwrap_file_key(&sealed_key, passphrase, &wrapped_key)
            .await?;
        let payload = EncryptedPayload {
            ciphertext: self.blobs.get(&record.storage_path).await?,
            iv,
        };
        let plaintext = self
            .engine
            .decrypt_payload(record.cipher, payload, key)
            .await?;

        if !expected.matches(&plaintext) {
            warn!("checksum mismatch on download of file {file_id}");
            return Err(FilesError::ChecksumMismatch(file_id));
        }

        debug!("downloaded file {file_id} for user {user_id}");
        Ok(plaintext)
    }

    /// Files owned by `owner_id`, oldest first.
    pub async fn list(&self, owner_id: &str) -> FilesResult<Vec<EncryptedFileRecord>> {
        self.records.list_files(owner_id).await
    }

    pub async fn file(&self, file_id: Uuid) -> FilesResult<EncryptedFileRecord> {
        self.records
            .get_file(file_id)
            .await?
            .ok_or_else(|| FilesError::NotFound(format!("file {file_id}")))
    }

    /// Deletes a file with its share grants and ciphertext. Owner only.
    ///
    /// The record goes last, so a failed delete leaves it in place and the
    /// call can be retried.
    pub async fn delete(&self, owner_id: &str, file_id: Uuid) -> FilesResult<()> {
        let record = self.file(file_id).await?;
        if record.owner_id != owner_id {
            return Err(FilesError::NotOwner {
                user: owner_id.to_string(),
                file_id,
            });
        }

        if !self.blobs.delete(&record.storage_path).await? {
            warn!("blob {} was already missing", record.storage_path);
        }
        let revoked = self.records.delete_shares_for_file(file_id).await?;
        self.records.delete_file(file_id).await?;

        info!("deleted file {file_id} and {revoked} share grant(s)");
        Ok(())
    }

    async fn wrapped_key_for(
        &self,
        user_id: &str,
        record: &EncryptedFileRecord,
    ) -> FilesResult<WrappedKey> {
        if record.owner_id == user_id {
            return Ok(WrappedKey::from_text(&record.wrapped_key)?);
        }

        let grant = self
            .records
            .shares_for_file(record.file_id)
            .await?
            .into_iter()
            .find(|g| g.recipient_id == user_id)
            .ok_or_else(|| FilesError::NotShared {
                user: user_id.to_string(),
                file_id: record.file_id,
            })?;
        Ok(WrappedKey::from_text(&grant.wrapped_key)?)
    }
}

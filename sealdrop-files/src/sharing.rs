//! Share workflow: grant, revoke and list access to encrypted files.
//!
//! Sharing unwraps the owner's copy of the file key and wraps it again under
//! each recipient's public key. The ciphertext in the blob store is never
//! read, re-encrypted or copied.

use crate::accounts::AccountManager;
use crate::config::FilesConfig;
use crate::error::{FilesError, FilesResult};
use crate::store::RecordStore;
use crate::types::{EncryptedFileRecord, ShareGrant, SharedFile};
use chrono::{Duration, Utc};
use sealdrop_crypto::{Engine, WrappedKey};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Orchestrates file sharing.
#[derive(Clone)]
pub struct ShareManager {
    engine: Engine,
    accounts: AccountManager,
    records: Arc<dyn RecordStore>,
    config: Arc<FilesConfig>,
}

impl ShareManager {
    pub fn new(engine: Engine, records: Arc<dyn RecordStore>, config: Arc<FilesConfig>) -> Self {
        Self {
            accounts: AccountManager::new(engine.clone(), Arc::clone(&records)),
            engine,
            records,
            config,
        }
    }

    /// Shares a file with one recipient.
    ///
    /// `ttl` of `None` falls back to the configured default lifetime.
    pub async fn share(
        &self,
        owner_id: &str,
        file_id: Uuid,
        recipient_id: &str,
        passphrase: &str,
        ttl: Option<Duration>,
    ) -> FilesResult<ShareGrant> {
        let mut grants = self
            .share_with_many(owner_id, file_id, &[recipient_id], passphrase, ttl)
            .await?;
        grants
            .pop()
            .ok_or_else(|| FilesError::InvalidRecipient(recipient_id.to_string()))
    }

    /// Shares a file with several recipients, unsealing the owner's key once.
    ///
    /// Re-sharing with an existing recipient replaces their grant.
    pub async fn share_with_many(
        &self,
        owner_id: &str,
        file_id: Uuid,
        recipient_ids: &[&str],
        passphrase: &str,
        ttl: Option<Duration>,
    ) -> FilesResult<Vec<ShareGrant>> {
        let record = self.owned_file(owner_id, file_id).await?;

        let mut recipients: Vec<&str> = Vec::with_capacity(recipient_ids.len());
        for &recipient in recipient_ids {
            if recipient == owner_id {
                return Err(FilesError::InvalidRecipient(format!(
                    "{recipient} already owns file {file_id}"
                )));
            }
            if !recipients.contains(&recipient) {
                recipients.push(recipient);
            }
        }
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let mut public_keys = Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            public_keys.push(self.accounts.public_key(recipient).await?);
        }

        let sealed_key = self.accounts.sealed_key(owner_id).await?;
        let own_wrapped = WrappedKey::from_text(&record.wrapped_key)?;
        let wrapped = self
            .engine
            .rewrap_file_key(&sealed_key, passphrase, &own_wrapped, &public_keys)
            .await?;

        let existing = self.records.shares_for_file(file_id).await?;
        let now = Utc::now();
        let expires_at = self.config.share_expiry(now, ttl);

        let grants: Vec<ShareGrant> = recipients
            .into_iter()
            .zip(wrapped)
            .map(|(recipient, wrapped_key)| ShareGrant {
                share_id: Uuid::now_v7(),
                file_id,
                owner_id: owner_id.to_string(),
                recipient_id: recipient.to_string(),
                wrapped_key: wrapped_key.to_text(),
                expires_at,
                created_at: now,
            })
            .collect();

        // All new grants land before any superseded grant is removed. A
        // failed insert rolls back the ones already written, leaving the
        // previous grants as they were.
        for (written, grant) in grants.iter().enumerate() {
            if let Err(e) = self.records.insert_share(grant.clone()).await {
                warn!("share insert failed for file {file_id}, rolling back: {e}");
                for inserted in &grants[..written] {
                    if let Err(undo) = self.records.delete_share(inserted.share_id).await {
                        warn!("failed to roll back share {}: {undo}", inserted.share_id);
                    }
                }
                return Err(e);
            }
        }

        for grant in &grants {
            for old in existing
                .iter()
                .filter(|g| g.recipient_id == grant.recipient_id)
            {
                self.records.delete_share(old.share_id).await?;
            }
            info!("shared file {file_id} with user {}", grant.recipient_id);
        }
        Ok(grants)
    }

    /// Deletes a grant. Owner only.
    ///
    /// A recipient who already unwrapped the file key keeps what they saw;
    /// revocation stops future downloads through this grant.
    pub async fn revoke(&self, owner_id: &str, share_id: Uuid) -> FilesResult<()> {
        let grant = self
            .records
            .get_share(share_id)
            .await?
            .ok_or_else(|| FilesError::NotFound(format!("share {share_id}")))?;
        if grant.owner_id != owner_id {
            return Err(FilesError::NotOwner {
                user: owner_id.to_string(),
                file_id: grant.file_id,
            });
        }

        self.records.delete_share(share_id).await?;
        info!(
            "revoked share of file {} from user {}",
            grant.file_id, grant.recipient_id
        );
        Ok(())
    }

    /// Grants on a file. Owner only.
    pub async fn shares_for_file(
        &self,
        owner_id: &str,
        file_id: Uuid,
    ) -> FilesResult<Vec<ShareGrant>> {
        self.owned_file(owner_id, file_id).await?;
        self.records.shares_for_file(file_id).await
    }

    /// Files shared with `user_id`, with the grant for each.
    pub async fn shared_with_me(&self, user_id: &str) -> FilesResult<Vec<SharedFile>> {
        let grants = self.records.shares_for_recipient(user_id).await?;
        let mut shared = Vec::with_capacity(grants.len());
        for grant in grants {
            match self.records.get_file(grant.file_id).await? {
                Some(file) => shared.push(SharedFile { file, grant }),
                None => warn!(
                    "share {} points at missing file {}",
                    grant.share_id, grant.file_id
                ),
            }
        }
        Ok(shared)
    }

    async fn owned_file(&self, owner_id: &str, file_id: Uuid) -> FilesResult<EncryptedFileRecord> {
        let record = self
            .records
            .get_file(file_id)
            .await?
            .ok_or_else(|| FilesError::NotFound(format!("file {file_id}")))?;
        if record.owner_id != owner_id {
            return Err(FilesError::NotOwner {
                user: owner_id.to_string(),
                file_id,
            });
        }
        Ok(record)
    }
}

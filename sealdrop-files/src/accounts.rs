//! Account key lifecycle: set up, rotate passphrase, look up public keys.

use crate::error::{FilesError, FilesResult};
use crate::store::RecordStore;
use crate::types::UserKeyRecord;
use chrono::Utc;
use sealdrop_crypto::{Engine, IdentityPublicKey, SealedPrivateKey};
use std::sync::Arc;
use tracing::info;

/// Creates and maintains each user's sealed identity keys.
#[derive(Clone)]
pub struct AccountManager {
    engine: Engine,
    records: Arc<dyn RecordStore>,
}

impl AccountManager {
    pub fn new(engine: Engine, records: Arc<dyn RecordStore>) -> Self {
        Self { engine, records }
    }

    /// Generates a keypair for `user_id` and stores it sealed under `passphrase`.
    ///
    /// Callers must not run two setups for the same user concurrently.
    pub async fn setup(&self, user_id: &str, passphrase: &str) -> FilesResult<UserKeyRecord> {
        if self.records.get_user_keys(user_id).await?.is_some() {
            return Err(FilesError::AccountExists(user_id.to_string()));
        }

        let bundle = self.engine.create_identity(passphrase).await?;
        let now = Utc::now();
        let record = UserKeyRecord {
            user_id: user_id.to_string(),
            public_key: bundle.public.to_text()?,
            sealed: bundle.sealed.to_fields(),
            fingerprint: bundle.public.fingerprint(self.engine.provider())?,
            created_at: now,
            updated_at: now,
        };
        self.records.put_user_keys(record.clone()).await?;

        info!("set up account keys for user {user_id} ({})", record.fingerprint);
        Ok(record)
    }

    pub async fn has_keys(&self, user_id: &str) -> FilesResult<bool> {
        Ok(self.records.get_user_keys(user_id).await?.is_some())
    }

    /// Re-seals the user's private key under `new_passphrase`.
    ///
    /// The stored record is replaced only after the re-seal succeeds, so a
    /// wrong `old_passphrase` leaves it untouched.
    pub async fn change_passphrase(
        &self,
        user_id: &str,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> FilesResult<UserKeyRecord> {
        let mut record = self.record(user_id).await?;
        let sealed = SealedPrivateKey::from_fields(&record.sealed)?;
        let resealed = self
            .engine
            .change_passphrase(&sealed, old_passphrase, new_passphrase)
            .await?;

        record.sealed = resealed.to_fields();
        record.updated_at = Utc::now();
        self.records.put_user_keys(record.clone()).await?;

        info!("changed passphrase for user {user_id}");
        Ok(record)
    }

    /// Checks a passphrase without touching any file.
    pub async fn verify_passphrase(&self, user_id: &str, passphrase: &str) -> FilesResult<()> {
        let sealed = self.sealed_key(user_id).await?;
        self.engine.verify_passphrase(&sealed, passphrase).await?;
        Ok(())
    }

    pub async fn public_key(&self, user_id: &str) -> FilesResult<IdentityPublicKey> {
        let record = self.record(user_id).await?;
        Ok(IdentityPublicKey::from_text(&record.public_key)?)
    }

    pub(crate) async fn sealed_key(&self, user_id: &str) -> FilesResult<SealedPrivateKey> {
        let record = self.record(user_id).await?;
        Ok(SealedPrivateKey::from_fields(&record.sealed)?)
    }

    async fn record(&self, user_id: &str) -> FilesResult<UserKeyRecord> {
        self.records
            .get_user_keys(user_id)
            .await?
            .ok_or_else(|| FilesError::NoAccount(user_id.to_string()))
    }
}

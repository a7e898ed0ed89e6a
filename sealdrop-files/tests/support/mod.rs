//! Shared test helpers: in-memory collaborators wired to fast engines.
#![allow(dead_code)]

use async_trait::async_trait;
use sealdrop_crypto::{Engine, EngineConfig, OsProvider};
use sealdrop_files::{
    AccountManager, BlobStore, EncryptedFileRecord, FileManager, FileUpload, FilesConfig,
    FilesError, FilesResult, MemoryBlobStore, MemoryRecordStore, RecordStore, ShareGrant,
    ShareManager, UserKeyRecord,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

pub const ALICE_PASS: &str = "alice-correct-horse-battery";
pub const BOB_PASS: &str = "bob-staple-quantum-cipher";
pub const CAROL_PASS: &str = "carol-long-enough-passphrase";

/// Engine settings with the smallest accepted modulus, for speed.
pub fn fast_config() -> FilesConfig {
    FilesConfig {
        engine: EngineConfig {
            modulus_bits: 2048,
            ..EngineConfig::default()
        },
        ..FilesConfig::default()
    }
}

pub struct Harness {
    pub config: Arc<FilesConfig>,
    pub records: MemoryRecordStore,
    pub blobs: MemoryBlobStore,
    pub faults: Arc<Faults>,
    pub accounts: AccountManager,
    pub files: FileManager,
    pub shares: ShareManager,
}

pub fn harness() -> Harness {
    harness_with(fast_config())
}

/// Builds a harness over in-memory stores. `records` and `blobs` bypass
/// `faults` for direct inspection; the managers go through them.
pub fn harness_with(config: FilesConfig) -> Harness {
    let config = Arc::new(config);
    let engine = Engine::new(Arc::new(OsProvider), config.engine.clone())
        .expect("test engine config must be valid");
    let records = MemoryRecordStore::new();
    let blobs = MemoryBlobStore::new();
    let faults = Arc::new(Faults::default());

    let record_store: Arc<dyn RecordStore> = Arc::new(FaultyRecords {
        inner: records.clone(),
        faults: Arc::clone(&faults),
    });
    let blob_store: Arc<dyn BlobStore> = Arc::new(FaultyBlobs {
        inner: blobs.clone(),
        faults: Arc::clone(&faults),
    });

    Harness {
        accounts: AccountManager::new(engine.clone(), Arc::clone(&record_store)),
        files: FileManager::new(
            engine.clone(),
            Arc::clone(&record_store),
            blob_store,
            Arc::clone(&config),
        ),
        shares: ShareManager::new(engine, record_store, Arc::clone(&config)),
        config,
        records,
        blobs,
        faults,
    }
}

// ── Fault injection ──

/// Storage failures the harness stores raise on demand. All off by default.
#[derive(Debug)]
pub struct Faults {
    reject_file_inserts: AtomicBool,
    reject_blob_deletes: AtomicBool,
    share_inserts_left: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            reject_file_inserts: AtomicBool::new(false),
            reject_blob_deletes: AtomicBool::new(false),
            share_inserts_left: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Faults {
    pub fn reject_file_inserts(&self, on: bool) {
        self.reject_file_inserts.store(on, Ordering::SeqCst);
    }

    pub fn reject_blob_deletes(&self, on: bool) {
        self.reject_blob_deletes.store(on, Ordering::SeqCst);
    }

    /// Lets `n` more share inserts through, then fails the rest.
    pub fn allow_share_inserts(&self, n: usize) {
        self.share_inserts_left.store(n, Ordering::SeqCst);
    }

    fn take_share_insert(&self) -> bool {
        self.share_inserts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

fn unavailable() -> FilesError {
    FilesError::Storage("database unavailable".into())
}

struct FaultyRecords {
    inner: MemoryRecordStore,
    faults: Arc<Faults>,
}

#[async_trait]
impl RecordStore for FaultyRecords {
    async fn get_user_keys(&self, user_id: &str) -> FilesResult<Option<UserKeyRecord>> {
        self.inner.get_user_keys(user_id).await
    }

    async fn put_user_keys(&self, record: UserKeyRecord) -> FilesResult<()> {
        self.inner.put_user_keys(record).await
    }

    async fn insert_file(&self, record: EncryptedFileRecord) -> FilesResult<()> {
        if self.faults.reject_file_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.insert_file(record).await
    }

    async fn get_file(&self, file_id: Uuid) -> FilesResult<Option<EncryptedFileRecord>> {
        self.inner.get_file(file_id).await
    }

    async fn list_files(&self, owner_id: &str) -> FilesResult<Vec<EncryptedFileRecord>> {
        self.inner.list_files(owner_id).await
    }

    async fn delete_file(&self, file_id: Uuid) -> FilesResult<bool> {
        self.inner.delete_file(file_id).await
    }

    async fn insert_share(&self, grant: ShareGrant) -> FilesResult<()> {
        if !self.faults.take_share_insert() {
            return Err(unavailable());
        }
        self.inner.insert_share(grant).await
    }

    async fn get_share(&self, share_id: Uuid) -> FilesResult<Option<ShareGrant>> {
        self.inner.get_share(share_id).await
    }

    async fn shares_for_file(&self, file_id: Uuid) -> FilesResult<Vec<ShareGrant>> {
        self.inner.shares_for_file(file_id).await
    }

    async fn shares_for_recipient(&self, recipient_id: &str) -> FilesResult<Vec<ShareGrant>> {
        self.inner.shares_for_recipient(recipient_id).await
    }

    async fn delete_share(&self, share_id: Uuid) -> FilesResult<bool> {
        self.inner.delete_share(share_id).await
    }

    async fn delete_shares_for_file(&self, file_id: Uuid) -> FilesResult<usize> {
        self.inner.delete_shares_for_file(file_id).await
    }
}

struct FaultyBlobs {
    inner: MemoryBlobStore,
    faults: Arc<Faults>,
}

#[async_trait]
impl BlobStore for FaultyBlobs {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> FilesResult<()> {
        self.inner.put(path, bytes).await
    }

    async fn get(&self, path: &str) -> FilesResult<Vec<u8>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> FilesResult<bool> {
        if self.faults.reject_blob_deletes.load(Ordering::SeqCst) {
            return Err(FilesError::Storage("blob store unavailable".into()));
        }
        self.inner.delete(path).await
    }
}

impl Harness {
    pub async fn alice(&self) -> UserKeyRecord {
        self.accounts.setup("alice", ALICE_PASS).await.expect("alice setup")
    }

    pub async fn bob(&self) -> UserKeyRecord {
        self.accounts.setup("bob", BOB_PASS).await.expect("bob setup")
    }

    pub async fn carol(&self) -> UserKeyRecord {
        self.accounts.setup("carol", CAROL_PASS).await.expect("carol setup")
    }
}

pub fn text_upload(name: &str, body: &str) -> FileUpload {
    FileUpload::new(name, "text/plain", body.as_bytes().to_vec())
}

/// Returns true if `needle` occurs anywhere in `haystack`.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

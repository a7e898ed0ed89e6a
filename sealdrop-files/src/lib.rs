//! Encrypted file storage and sharing for sealdrop.
//!
//! Ties the envelope encryption engine to two external collaborators: a
//! record store (user keys, file metadata, share grants) and a blob store
//! (ciphertext). Neither ever receives plaintext, a passphrase or an
//! unsealed private key.
//!
//! - [`AccountManager`]: per-user identity keys, sealed under a passphrase.
//! - [`FileManager`]: upload, download and delete.
//! - [`ShareManager`]: grant and revoke access without re-uploading.

pub mod accounts;
pub mod config;
mod error;
pub mod files;
pub mod logging;
pub mod memory;
pub mod sharing;
pub mod store;
pub mod types;

pub use accounts::AccountManager;
pub use config::FilesConfig;
pub use error::{FilesError, FilesResult};
pub use files::FileManager;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use sharing::ShareManager;
pub use store::{BlobStore, RecordStore};
pub use types::{
    EncryptedFileRecord, FileUpload, ShareGrant, SharedFile, UserKeyRecord, blob_storage_path,
};

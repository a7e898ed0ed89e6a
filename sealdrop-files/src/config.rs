//! File workflow configuration.

use crate::error::{FilesError, FilesResult};
use chrono::{DateTime, Duration, Utc};
use sealdrop_crypto::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the file workflows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Root prefix for blob storage paths (e.g., a bucket folder).
    pub storage_prefix: String,

    /// Largest plaintext accepted by `upload`.
    pub max_file_size_bytes: u64,

    /// Lifetime given to share grants when the caller does not pick one.
    /// `None` means grants never expire.
    pub default_share_ttl_hours: Option<i64>,

    /// Envelope encryption settings.
    pub engine: EngineConfig,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_prefix: "sealdrop".to_string(),
            max_file_size_bytes: 100 * 1024 * 1024, // 100 MiB
            default_share_ttl_hours: None,
            engine: EngineConfig::default(),
        }
    }
}

impl FilesConfig {
    pub fn from_json_str(json: &str) -> FilesResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> FilesResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> FilesResult<()> {
        let prefix = self.storage_prefix.trim();
        if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(FilesError::Config(format!(
                "storage_prefix must be non-empty without leading or trailing '/', got {:?}",
                self.storage_prefix
            )));
        }
        if self.max_file_size_bytes == 0 {
            return Err(FilesError::Config(
                "max_file_size_bytes must be non-zero".to_string(),
            ));
        }
        if let Some(hours) = self.default_share_ttl_hours {
            if hours <= 0 {
                return Err(FilesError::Config(format!(
                    "default_share_ttl_hours must be positive, got {hours}"
                )));
            }
        }
        self.engine
            .validate()
            .map_err(|e| FilesError::Config(e.to_string()))
    }

    pub fn default_share_ttl(&self) -> Option<Duration> {
        self.default_share_ttl_hours.map(Duration::hours)
    }

    /// Expiry for a grant created at `now` with an optional explicit lifetime.
    pub fn share_expiry(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
        ttl.or_else(|| self.default_share_ttl()).map(|ttl| now + ttl)
    }
}

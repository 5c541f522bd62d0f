use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::rocks::RocksStore;
use crate::sqlite::SqliteStore;
use crate::traits::{CredentialStore, VerificationLog};

/// Which storage engine backs a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
    #[default]
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(StoreError::Backend(format!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Storage section of a service config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage engine.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Database file (sqlite) or directory (rocksdb). Ignored for memory.
    pub path: PathBuf,
}

impl StorageConfig {
    pub fn new(backend: StorageBackend, path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }
}

/// Open the issuance record store described by `config`.
pub fn open_credential_store(
    config: &StorageConfig,
) -> Result<Arc<dyn CredentialStore>, StoreError> {
    let store: Arc<dyn CredentialStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Rocksdb => Arc::new(RocksStore::open(&config.path)?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
    };
    tracing::info!(backend = ?config.backend, path = %config.path.display(), "credential store ready");
    Ok(store)
}

/// Open the verification log described by `config`.
pub fn open_verification_log(
    config: &StorageConfig,
) -> Result<Arc<dyn VerificationLog>, StoreError> {
    let log: Arc<dyn VerificationLog> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Rocksdb => Arc::new(RocksStore::open(&config.path)?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
    };
    tracing::info!(backend = ?config.backend, path = %config.path.display(), "verification log ready");
    Ok(log)
}

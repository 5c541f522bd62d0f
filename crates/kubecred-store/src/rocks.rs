//! RocksDB storage backend.
//!
//! Issuance records are inserted through an optimistic transaction: the
//! commit fails if another writer touched the same key after our
//! `get_for_update`, which is the uniqueness backstop. RocksDB holds an
//! exclusive lock on its directory, so one data directory serves one process.

use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode,
    OptimisticTransactionDB, Options,
};
use std::path::Path;
use uuid::Uuid;

use kubecred_core::{CredentialHash, CredentialRecord, VerificationLogEntry};

use crate::error::StoreError;
use crate::traits::{CredentialStore, VerificationLog};

/// Column family names for different data types.
const CF_CREDENTIALS: &str = "credentials";
const CF_VERIFICATION_LOGS: &str = "verification_logs";

/// RocksDB-backed storage for credentials and verification logs.
pub struct RocksStore {
    db: OptimisticTransactionDB,
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CREDENTIALS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VERIFICATION_LOGS, Options::default()),
        ];

        let db: OptimisticTransactionDB =
            OptimisticTransactionDB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        tracing::debug!(path = %path.display(), "rocksdb store opened");
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("column family '{}' not found", name)))
    }

    fn count_cf(&self, name: &str) -> Result<usize, StoreError> {
        let cf = self.cf(name)?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

/// Log keys are `<hash>/<uuid v7>` so a prefix scan yields one hash's
/// entries in insertion order.
fn log_prefix(hash: &CredentialHash) -> String {
    format!("{}/", hash)
}

impl CredentialStore for RocksStore {
    fn find(&self, hash: &CredentialHash) -> Result<Option<CredentialRecord>, StoreError> {
        let cf = self.cf(CF_CREDENTIALS)?;
        match self.db.get_cf(cf, hash.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let cf = self.cf(CF_CREDENTIALS)?;
        let key = record.credential_hash.as_str().as_bytes();
        let value = serde_json::to_vec(record)?;

        let txn = self.db.transaction();
        if txn.get_for_update_cf(cf, key, true)?.is_some() {
            return Err(StoreError::Duplicate(record.credential_hash.clone()));
        }
        txn.put_cf(cf, key, &value)?;

        match txn.commit() {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::Busy | ErrorKind::TryAgain) => {
                // Conflict: someone committed this key after our read.
                if self.db.get_cf(cf, key)?.is_some() {
                    Err(StoreError::Duplicate(record.credential_hash.clone()))
                } else {
                    Err(e.into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn record_count(&self) -> Result<usize, StoreError> {
        self.count_cf(CF_CREDENTIALS)
    }
}

impl VerificationLog for RocksStore {
    fn append(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        let cf = self.cf(CF_VERIFICATION_LOGS)?;
        let key = format!("{}{}", log_prefix(&entry.credential_hash), Uuid::now_v7());
        let value = serde_json::to_vec(entry)?;
        self.db.put_cf(cf, key.as_bytes(), &value)?;
        Ok(())
    }

    fn history(&self, hash: &CredentialHash) -> Result<Vec<VerificationLogEntry>, StoreError> {
        let cf = self.cf(CF_VERIFICATION_LOGS)?;
        let prefix = log_prefix(hash);
        let mut entries = Vec::new();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let entry: VerificationLogEntry = serde_json::from_slice(&value)?;
            // Hashes containing '/' can share a prefix with another hash.
            if entry.credential_hash == *hash {
                entries.push(entry);
            }
        }

        entries.reverse();
        entries.sort_by(|a, b| b.verified_at.cmp(&a.verified_at));
        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        self.count_cf(CF_VERIFICATION_LOGS)
    }
}

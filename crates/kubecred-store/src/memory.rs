use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use kubecred_core::{CredentialHash, CredentialRecord, VerificationLogEntry};

use crate::error::StoreError;
use crate::traits::{CredentialStore, VerificationLog};

/// In-process store for tests and single-node demos. Contents are lost on
/// restart.
#[derive(Default)]
pub struct MemoryStore {
    /// Credential hash → issuance record.
    credentials: DashMap<CredentialHash, CredentialRecord>,
    /// Credential hash → verification attempts, oldest first.
    logs: DashMap<CredentialHash, Vec<VerificationLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn find(&self, hash: &CredentialHash) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.credentials.get(hash).map(|e| e.value().clone()))
    }

    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        // The shard lock held by `entry` makes the check and the insert one step.
        match self.credentials.entry(record.credential_hash.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.credential_hash.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn record_count(&self) -> Result<usize, StoreError> {
        Ok(self.credentials.len())
    }
}

impl VerificationLog for MemoryStore {
    fn append(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        self.logs
            .entry(entry.credential_hash.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    fn history(&self, hash: &CredentialHash) -> Result<Vec<VerificationLogEntry>, StoreError> {
        Ok(self
            .logs
            .get(hash)
            .map(|e| e.value().iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        Ok(self.logs.iter().map(|e| e.value().len()).sum())
    }
}

use kubecred_core::{CredentialHash, CredentialRecord, VerificationLogEntry};

use crate::error::StoreError;

/// Persistent set of issued credentials, unique by hash.
///
/// Implementations must enforce uniqueness themselves: two concurrent
/// `insert` calls for the same hash, from any number of handles or
/// processes sharing the backend, leave exactly one record and exactly one
/// `Ok(())`. The loser receives [`StoreError::Duplicate`].
pub trait CredentialStore: Send + Sync {
    /// Look up the record for a hash.
    fn find(&self, hash: &CredentialHash) -> Result<Option<CredentialRecord>, StoreError>;

    /// Insert a record if no record exists for its hash.
    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError>;

    /// Number of stored records.
    fn record_count(&self) -> Result<usize, StoreError>;
}

/// Append-only audit trail of verification attempts.
pub trait VerificationLog: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: &VerificationLogEntry) -> Result<(), StoreError>;

    /// All entries for a hash, newest first.
    fn history(&self, hash: &CredentialHash) -> Result<Vec<VerificationLogEntry>, StoreError>;

    /// Number of entries across all hashes.
    fn entry_count(&self) -> Result<usize, StoreError>;
}

//! Issue and check operations over the credential store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use kubecred_core::{
    validate_credential, CredentialHash, CredentialHasher, CredentialRecord, ExistenceResult,
    ServiceError, WorkerId,
};
use kubecred_store::{CredentialStore, StoreError};

/// Returned to the caller after a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReceipt {
    pub message: String,
    pub credential_hash: CredentialHash,
    pub worker_id: WorkerId,
    pub issued_at: DateTime<Utc>,
}

/// Registers credential hashes and answers existence checks.
pub struct IssuanceService {
    /// This process's worker id, stamped on every record it creates.
    worker_id: WorkerId,
    hasher: CredentialHasher,
    store: Arc<dyn CredentialStore>,
}

impl IssuanceService {
    pub fn new(worker_id: WorkerId, hasher: CredentialHasher, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            worker_id,
            hasher,
            store,
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Register a credential. The first caller for a given plaintext wins;
    /// everyone after it gets [`ServiceError::AlreadyIssued`].
    pub fn issue(&self, plaintext: &str) -> Result<IssueReceipt, ServiceError> {
        let plaintext = validate_credential(plaintext)?;
        let hash = self.hasher.hash(plaintext);

        if self.lookup(&hash)?.is_some() {
            tracing::debug!(hash = %hash, "credential already issued");
            return Err(ServiceError::AlreadyIssued);
        }

        let record = CredentialRecord::new(hash, self.worker_id.clone());
        match self.store.insert(&record) {
            Ok(()) => {
                tracing::info!(
                    hash = %record.credential_hash,
                    worker = %self.worker_id,
                    "credential issued"
                );
                Ok(IssueReceipt {
                    message: format!(
                        "Credential issued successfully with worker {}",
                        self.worker_id
                    ),
                    credential_hash: record.credential_hash,
                    worker_id: record.worker_id,
                    issued_at: record.issued_at,
                })
            }
            Err(StoreError::Duplicate(hash)) => {
                tracing::info!(hash = %hash, "lost issuance race to another writer");
                Err(ServiceError::AlreadyIssued)
            }
            Err(e) => Err(storage_failure(e)),
        }
    }

    /// Report whether a hash was issued, and by whom.
    pub fn check(&self, credential_hash: &str) -> Result<ExistenceResult, ServiceError> {
        let hash = CredentialHash::parse(credential_hash)?;
        let result = self
            .lookup(&hash)?
            .map(ExistenceResult::from)
            .unwrap_or_else(ExistenceResult::absent);
        tracing::debug!(hash = %hash, exists = result.exists, "credential checked");
        Ok(result)
    }

    fn lookup(&self, hash: &CredentialHash) -> Result<Option<CredentialRecord>, ServiceError> {
        self.store.find(hash).map_err(storage_failure)
    }
}

fn storage_failure(err: StoreError) -> ServiceError {
    tracing::error!(error = %err, "credential store failure");
    ServiceError::StorageFailure(err.to_string())
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use kubecred_core::{
    validate_credential, CredentialHash, CredentialHasher, ServiceError, VerificationLogEntry,
    WorkerId,
};
use kubecred_store::{StoreError, VerificationLog};

use crate::client::IssuanceCheck;

/// Judgment returned to the caller of `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_valid: bool,
    /// Names the verification worker that produced the judgment.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<WorkerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

/// Re-derives credential hashes and asks the issuance service about them.
pub struct VerificationService {
    worker_id: WorkerId,
    /// Must be keyed with the same secret as the issuance service.
    hasher: CredentialHasher,
    log: Arc<dyn VerificationLog>,
    issuance: Arc<dyn IssuanceCheck>,
}

impl VerificationService {
    pub fn new(
        worker_id: WorkerId,
        hasher: CredentialHasher,
        log: Arc<dyn VerificationLog>,
        issuance: Arc<dyn IssuanceCheck>,
    ) -> Self {
        Self {
            worker_id,
            hasher,
            log,
            issuance,
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Verify a credential plaintext.
    ///
    /// Every call the issuance service answers appends exactly one log entry.
    /// A failed issuance check writes nothing and is returned as
    /// [`ServiceError::PeerUnavailable`], never as a negative verdict.
    pub async fn verify(&self, plaintext: &str) -> Result<Verdict, ServiceError> {
        let plaintext = validate_credential(plaintext)?;
        let hash = self.hasher.hash(plaintext);

        let existence = match self.issuance.check(&hash).await {
            Ok(existence) => existence,
            Err(err) => {
                tracing::warn!(hash = %hash, error = %err, "issuance check failed");
                return Err(ServiceError::PeerUnavailable(err.to_string()));
            }
        };

        self.record(&hash, existence.exists).await?;
        tracing::info!(
            hash = %hash,
            is_valid = existence.exists,
            worker = %self.worker_id,
            "credential verified"
        );

        if existence.exists {
            Ok(Verdict {
                is_valid: true,
                message: format!("credential verified by {}", self.worker_id),
                issued_by: existence.worker_id,
                issued_at: existence.issued_at,
            })
        } else {
            Ok(Verdict {
                is_valid: false,
                message: format!("credential not found - verified by {}", self.worker_id),
                issued_by: None,
                issued_at: None,
            })
        }
    }

    /// Verification attempts recorded for a hash, newest first.
    pub async fn history(
        &self,
        credential_hash: &str,
    ) -> Result<Vec<VerificationLogEntry>, ServiceError> {
        let hash = CredentialHash::parse(credential_hash)?;
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || log.history(&hash))
            .await
            .map_err(|e| ServiceError::StorageFailure(e.to_string()))?
            .map_err(storage_failure)
    }

    async fn record(&self, hash: &CredentialHash, is_valid: bool) -> Result<(), ServiceError> {
        let entry = VerificationLogEntry::new(hash.clone(), is_valid, self.worker_id.clone());
        let log = Arc::clone(&self.log);
        tokio::task::spawn_blocking(move || log.append(&entry))
            .await
            .map_err(|e| ServiceError::StorageFailure(e.to_string()))?
            .map_err(storage_failure)
    }
}

fn storage_failure(err: StoreError) -> ServiceError {
    tracing::error!(error = %err, "verification log failure");
    ServiceError::StorageFailure(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use kubecred_core::{CredentialRecord, ExistenceResult};
    use kubecred_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::client::PeerError;

    const SECRET: &str = "shared-secret";

    /// Stand-in for the issuance service, keyed by hash.
    #[derive(Default)]
    struct FakeIssuance {
        issued: DashMap<CredentialHash, CredentialRecord>,
        calls: AtomicUsize,
    }

    impl FakeIssuance {
        fn with_issued(plaintext: &str, worker: &str) -> Self {
            let fake = Self::default();
            let hash = CredentialHasher::new(SECRET).unwrap().hash(plaintext);
            let record = CredentialRecord::new(hash.clone(), WorkerId::new(worker).unwrap());
            fake.issued.insert(hash, record);
            fake
        }
    }

    #[async_trait]
    impl IssuanceCheck for FakeIssuance {
        async fn check(&self, hash: &CredentialHash) -> Result<ExistenceResult, PeerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .issued
                .get(hash)
                .map(|r| ExistenceResult::from(r.value().clone()))
                .unwrap_or_else(ExistenceResult::absent))
        }
    }

    struct DownIssuance;

    #[async_trait]
    impl IssuanceCheck for DownIssuance {
        async fn check(&self, _: &CredentialHash) -> Result<ExistenceResult, PeerError> {
            Err(PeerError::Transport("connection refused".into()))
        }
    }

    fn service(issuance: Arc<dyn IssuanceCheck>) -> (VerificationService, Arc<MemoryStore>) {
        let log = Arc::new(MemoryStore::new());
        let svc = VerificationService::new(
            WorkerId::new("V1").unwrap(),
            CredentialHasher::new(SECRET).unwrap(),
            log.clone(),
            issuance,
        );
        (svc, log)
    }

    #[tokio::test]
    async fn test_verify_issued_credential() {
        let (svc, log) = service(Arc::new(FakeIssuance::with_issued("MyS3cur3P@ssw0rd!", "W1")));
        let verdict = svc.verify("MyS3cur3P@ssw0rd!").await.unwrap();
        assert!(verdict.is_valid);
        assert_eq!(verdict.issued_by.unwrap().as_str(), "W1");
        assert!(verdict.issued_at.is_some());
        assert_eq!(verdict.message, "credential verified by V1");
        assert_eq!(log.entry_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_unknown_credential() {
        let (svc, log) = service(Arc::new(FakeIssuance::with_issued("MyS3cur3P@ssw0rd!", "W1")));
        let verdict = svc.verify("WrongPass!").await.unwrap();
        assert!(!verdict.is_valid);
        assert!(verdict.issued_by.is_none());
        assert_eq!(verdict.message, "credential not found - verified by V1");

        let hash = CredentialHasher::new(SECRET).unwrap().hash("WrongPass!");
        let history = log.history(&hash).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_valid);
        assert_eq!(history[0].verified_by.as_str(), "V1");
    }

    #[tokio::test]
    async fn test_every_verify_appends_one_entry() {
        let (svc, log) = service(Arc::new(FakeIssuance::with_issued("a", "W1")));
        for plaintext in ["a", "b", "a", "c"] {
            svc.verify(plaintext).await.unwrap();
        }
        assert_eq!(log.entry_count().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_input_no_call_no_log() {
        let fake = Arc::new(FakeIssuance::default());
        let (svc, log) = service(fake.clone());
        let err = svc.verify("").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert_eq!(log.entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_peer_down_is_distinct_from_not_found() {
        let (svc, log) = service(Arc::new(DownIssuance));
        let err = svc.verify("anything").await.unwrap_err();
        assert!(matches!(err, ServiceError::PeerUnavailable(_)));
        // Nothing recorded, so the log never shows a false negative.
        assert_eq!(log.entry_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_via_service() {
        let (svc, _) = service(Arc::new(FakeIssuance::with_issued("a", "W1")));
        svc.verify("a").await.unwrap();
        svc.verify("a").await.unwrap();
        let hash = CredentialHasher::new(SECRET).unwrap().hash("a");
        let history = svc.history(hash.as_str()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.is_valid));
        assert!(matches!(
            svc.history("").await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_verdict_json_shape() {
        let verdict = Verdict {
            is_valid: false,
            message: "credential not found - verified by V1".into(),
            issued_by: None,
            issued_at: None,
        };
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "isValid": false,
                "message": "credential not found - verified by V1"
            })
        );
    }
}

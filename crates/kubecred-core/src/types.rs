use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::hashing::DIGEST_HEX_LEN;

/// Current time at the precision every backend stores (microseconds), so a
/// timestamp handed to a caller is the same one later read back.
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Reject a missing or empty credential before it reaches the hasher.
pub fn validate_credential(plaintext: &str) -> Result<&str, CoreError> {
    if plaintext.is_empty() {
        return Err(CoreError::ValidationError(
            "credential must be a non-empty string".into(),
        ));
    }
    Ok(plaintext)
}

/// Pull a required, non-empty string field out of a JSON request body.
pub fn string_field<'a>(body: &'a serde_json::Value, field: &str) -> Result<&'a str, CoreError> {
    match body.get(field) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s),
        Some(serde_json::Value::String(_)) => Err(CoreError::ValidationError(format!(
            "'{}' must not be empty",
            field
        ))),
        Some(_) => Err(CoreError::ValidationError(format!(
            "'{}' must be a string",
            field
        ))),
        None => Err(CoreError::ValidationError(format!(
            "missing field '{}'",
            field
        ))),
    }
}

/// Keyed digest of a credential. The only durable identity a credential has.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Accept a caller-supplied hash. Any non-empty string is a valid lookup
    /// key; strings that are not digests simply never match a record.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.is_empty() {
            return Err(CoreError::ValidationError(
                "credential_hash must be a non-empty string".into(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when this looks like an HMAC-SHA256 hex digest.
    pub fn is_digest(&self) -> bool {
        self.0.len() == DIGEST_HEX_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl fmt::Display for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CredentialHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a service process, used for attribution only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "worker id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A credential registered by the issuance service. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub credential_hash: CredentialHash,
    pub worker_id: WorkerId,
    pub issued_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// A fresh record stamped with the current time.
    pub fn new(credential_hash: CredentialHash, worker_id: WorkerId) -> Self {
        Self {
            credential_hash,
            worker_id,
            issued_at: now_micros(),
        }
    }
}

/// One resolved verification attempt. Append-only.
///
/// Only attempts where the issuance service actually answered are recorded,
/// so `is_valid = false` always means "not issued".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationLogEntry {
    pub credential_hash: CredentialHash,
    pub is_valid: bool,
    pub verified_by: WorkerId,
    pub verified_at: DateTime<Utc>,
}

impl VerificationLogEntry {
    pub fn new(credential_hash: CredentialHash, is_valid: bool, verified_by: WorkerId) -> Self {
        Self {
            credential_hash,
            is_valid,
            verified_by,
            verified_at: now_micros(),
        }
    }
}

/// Answer to an existence check. Carries metadata only, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistenceResult {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl ExistenceResult {
    pub fn absent() -> Self {
        Self {
            exists: false,
            worker_id: None,
            issued_at: None,
        }
    }
}

impl From<CredentialRecord> for ExistenceResult {
    fn from(record: CredentialRecord) -> Self {
        Self {
            exists: true,
            worker_id: Some(record.worker_id),
            issued_at: Some(record.issued_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credential() {
        assert!(validate_credential("").is_err());
        assert_eq!(validate_credential("abc").unwrap(), "abc");
        // Whitespace is still a credential.
        assert!(validate_credential(" ").is_ok());
    }

    #[test]
    fn test_string_field() {
        let body = serde_json::json!({"credential": "secret", "n": 5, "e": ""});
        assert_eq!(string_field(&body, "credential").unwrap(), "secret");
        assert!(string_field(&body, "n").is_err());
        assert!(string_field(&body, "e").is_err());
        assert!(string_field(&body, "missing").is_err());
        assert!(string_field(&serde_json::json!(["credential"]), "credential").is_err());
    }

    #[test]
    fn test_hash_parse_rejects_empty() {
        assert!(CredentialHash::parse("").is_err());
        let h = CredentialHash::parse("not-a-digest").unwrap();
        assert!(!h.is_digest());
    }

    #[test]
    fn test_hash_is_digest() {
        let h = CredentialHash::from_digest(&[0xabu8; 32]);
        assert_eq!(h.as_str().len(), 64);
        assert!(h.is_digest());
        let upper = CredentialHash::parse(&"AB".repeat(32)).unwrap();
        assert!(!upper.is_digest());
    }

    #[test]
    fn test_worker_id_rejects_blank() {
        assert!(WorkerId::new("").is_err());
        assert!(WorkerId::new("   ").is_err());
        assert_eq!(WorkerId::new("W1").unwrap().to_string(), "W1");
    }

    #[test]
    fn test_timestamps_are_microsecond_precision() {
        let record = CredentialRecord::new(
            CredentialHash::parse("h").unwrap(),
            WorkerId::new("W1").unwrap(),
        );
        assert_eq!(record.issued_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(record.issued_at, record.issued_at.trunc_subsecs(6));

        let entry = VerificationLogEntry::new(
            CredentialHash::parse("h").unwrap(),
            true,
            WorkerId::new("V1").unwrap(),
        );
        assert_eq!(entry.verified_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_log_entry_json_shape() {
        let entry = VerificationLogEntry::new(
            CredentialHash::parse("h").unwrap(),
            false,
            WorkerId::new("v1").unwrap(),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["credential_hash"], "h");
        assert_eq!(value["is_valid"], false);
        assert_eq!(value["verified_by"], "v1");
        assert!(value["verified_at"].is_string());
    }

    #[test]
    fn test_existence_result_json_shape() {
        let absent = serde_json::to_value(ExistenceResult::absent()).unwrap();
        assert_eq!(absent, serde_json::json!({"exists": false}));

        let record = CredentialRecord::new(
            CredentialHash::parse("abc").unwrap(),
            WorkerId::new("W1").unwrap(),
        );
        let present = serde_json::to_value(ExistenceResult::from(record)).unwrap();
        assert_eq!(present["exists"], true);
        assert_eq!(present["worker_id"], "W1");
        assert!(present["issued_at"].is_string());
    }

    #[test]
    fn test_existence_result_tolerates_missing_metadata() {
        let parsed: ExistenceResult = serde_json::from_str(r#"{"exists":false}"#).unwrap();
        assert_eq!(parsed, ExistenceResult::absent());
    }
}

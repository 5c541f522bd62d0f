//! The verification service's view of the issuance service.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use kubecred_core::{CredentialHash, ExistenceResult};

/// Failure to obtain an answer from the issuance service.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("issuance service returned HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),
}

/// Capability to ask whether a hash was issued.
///
/// Injected into [`crate::VerificationService`] so tests can substitute a
/// fake for the network round trip.
#[async_trait]
pub trait IssuanceCheck: Send + Sync {
    async fn check(&self, hash: &CredentialHash) -> Result<ExistenceResult, PeerError>;
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    credential_hash: &'a str,
}

/// Calls `POST {base_url}/check` on the issuance service.
pub struct HttpIssuanceClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIssuanceClient {
    /// Create a client. `timeout` bounds the whole request, connect included.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PeerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl IssuanceCheck for HttpIssuanceClient {
    async fn check(&self, hash: &CredentialHash) -> Result<ExistenceResult, PeerError> {
        let url = format!("{}/check", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&CheckRequest {
                credential_hash: hash.as_str(),
            })
            .send()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }

        resp.json::<ExistenceResult>()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }
}

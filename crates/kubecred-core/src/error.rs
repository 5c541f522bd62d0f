/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid hashing key: {0}")]
    InvalidKey(String),
}

/// Outcomes of the issuance and verification operations that are not a
/// plain success.
///
/// `AlreadyIssued` is an expected business result rather than a fault, and
/// `PeerUnavailable` must never be folded into a negative verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("credential already issued")]
    AlreadyIssued,

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("issuance service unavailable: {0}")]
    PeerUnavailable(String),
}

impl ServiceError {
    /// Whether the caller is at fault (4xx) rather than the service (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::AlreadyIssued)
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => Self::InvalidInput(msg),
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

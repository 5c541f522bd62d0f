use kubecred_core::CredentialHash;

/// Storage-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The uniqueness constraint on `credential_hash` rejected an insert.
    #[error("credential already exists: {0}")]
    Duplicate(CredentialHash),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Backend(format!("rocksdb: {}", err))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(format!("sqlite: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

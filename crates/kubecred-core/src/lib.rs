//! Kube Credentials Core: Credential identity types, keyed hashing, errors,
//! and configuration shared by the issuance and verification services.

pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod types;

pub use config::{
    resolve_worker_id, HashingConfig, LogFormat, LoggingConfig, ServerConfig, DEV_SECRET,
};
pub use error::{CoreError, ServiceError};
pub use hashing::{CredentialHasher, DIGEST_HEX_LEN};
pub use logging::init_logging;
pub use types::{
    string_field, validate_credential, CredentialHash, CredentialRecord, ExistenceResult,
    VerificationLogEntry, WorkerId,
};

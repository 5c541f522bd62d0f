//! Kube Credentials Store: Persistence for issuance records and the
//! verification audit trail.

pub mod backend;
pub mod error;
pub mod memory;
pub mod rocks;
pub mod sqlite;
pub mod traits;

pub use backend::{open_credential_store, open_verification_log, StorageBackend, StorageConfig};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use sqlite::SqliteStore;
pub use traits::{CredentialStore, VerificationLog};

//! Kube Credentials Issuance: Registers keyed credential hashes and answers
//! existence checks for the verification service.

pub mod api;
pub mod config;
pub mod service;

pub use config::IssuanceConfig;
pub use service::{IssuanceService, IssueReceipt};

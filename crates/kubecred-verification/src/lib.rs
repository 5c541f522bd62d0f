//! Kube Credentials Verification: Re-derives credential hashes, asks the
//! issuance service whether they were issued, and logs every answered attempt.

pub mod api;
pub mod client;
pub mod config;
pub mod service;

pub use client::{HttpIssuanceClient, IssuanceCheck, PeerError};
pub use config::{PeerConfig, VerificationConfig};
pub use service::{Verdict, VerificationService};

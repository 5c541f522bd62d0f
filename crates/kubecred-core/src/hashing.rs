//! Keyed credential hashing (HMAC-SHA256, lowercase hex).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::error::CoreError;
use crate::types::CredentialHash;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hashes credentials under a fixed secret key.
///
/// The keyed MAC state is prepared once and cloned per call, so a single
/// hasher can be shared across request handlers.
#[derive(Clone)]
pub struct CredentialHasher {
    mac: HmacSha256,
}

impl CredentialHasher {
    /// Create a hasher for the given secret. Empty secrets are rejected.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CoreError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CoreError::InvalidKey("secret must not be empty".into()));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| CoreError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Hash a credential plaintext.
    pub fn hash(&self, plaintext: &str) -> CredentialHash {
        let mut mac = self.mac.clone();
        mac.update(plaintext.as_bytes());
        CredentialHash::from_digest(&mac.finalize().into_bytes())
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

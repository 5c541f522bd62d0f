//! Verification service configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kubecred_core::{HashingConfig, LoggingConfig, ServerConfig};
use kubecred_store::{StorageBackend, StorageConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    /// Where to reach the issuance service.
    #[serde(default)]
    pub peer: PeerConfig,

    /// Must carry the same secret as the issuance service.
    #[serde(default)]
    pub hashing: HashingConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Base URL of the issuance service.
    #[serde(default = "default_issuance_url")]
    pub issuance_url: String,
    /// Upper bound on one existence check, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

pub const DEFAULT_PORT: u16 = 3002;

fn default_server() -> ServerConfig {
    ServerConfig::with_port(DEFAULT_PORT)
}
fn default_issuance_url() -> String {
    "http://localhost:3001".into()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_storage() -> StorageConfig {
    StorageConfig::new(StorageBackend::Sqlite, PathBuf::from("./data/verification.db"))
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            issuance_url: default_issuance_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PeerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            peer: PeerConfig::default(),
            hashing: HashingConfig::default(),
            storage: default_storage(),
            logging: LoggingConfig::default(),
        }
    }
}

impl VerificationConfig {
    /// Load config from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.socket_addr(DEFAULT_PORT)?)
    }
}

//! Issuance service configuration loading and management.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use kubecred_core::{HashingConfig, LoggingConfig, ServerConfig};
use kubecred_store::{StorageBackend, StorageConfig};

/// Full configuration for the issuance service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceConfig {
    /// HTTP listener and worker identity.
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    /// Credential hashing settings.
    #[serde(default)]
    pub hashing: HashingConfig,

    /// Storage settings.
    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Port used when the `[server]` table names none.
pub const DEFAULT_PORT: u16 = 3001;

fn default_server() -> ServerConfig {
    ServerConfig::with_port(DEFAULT_PORT)
}
fn default_storage() -> StorageConfig {
    StorageConfig::new(StorageBackend::Sqlite, PathBuf::from("./data/issuance.db"))
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            hashing: HashingConfig::default(),
            storage: default_storage(),
            logging: LoggingConfig::default(),
        }
    }
}

impl IssuanceConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: IssuanceConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.server.socket_addr(DEFAULT_PORT)?)
    }
}

//! Configuration sections shared by both services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::error::CoreError;
use crate::hashing::CredentialHasher;
use crate::types::WorkerId;

/// Secret used when none is configured. Only fit for local development.
pub const DEV_SECRET: &str = "supersecretkey";

/// HTTP listener and worker identity of one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Listen port. Unset means the service's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Worker id. Generated from the host name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
}

impl ServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port: Some(port),
            ..Self::default()
        }
    }

    pub fn socket_addr(&self, default_port: u16) -> Result<SocketAddr, CoreError> {
        let port = self.port.unwrap_or(default_port);
        format!("{}:{}", self.listen_addr, port)
            .parse()
            .map_err(|e| CoreError::ValidationError(format!("listen address: {}", e)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: None,
            worker_id: None,
        }
    }
}

/// Settings for the keyed credential hash.
#[derive(Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Shared HMAC secret. Must be identical on issuance and verification.
    #[serde(default = "default_secret")]
    pub secret: String,
}

impl HashingConfig {
    pub fn is_dev_secret(&self) -> bool {
        self.secret == DEV_SECRET
    }

    pub fn hasher(&self) -> Result<CredentialHasher, CoreError> {
        CredentialHasher::new(self.secret.as_bytes())
    }
}

impl fmt::Debug for HashingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashingConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CoreError::ValidationError(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}
fn default_secret() -> String {
    DEV_SECRET.into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Resolve the worker id for a process: the configured value if any,
/// otherwise `<prefix>-<suffix>` where the suffix is the tail of the host
/// name (pod names in Kubernetes) or random hex.
///
/// `HOSTNAME` overrides the name read from `/etc/hostname`.
pub fn resolve_worker_id(configured: Option<&str>, prefix: &str) -> Result<WorkerId, CoreError> {
    if let Some(id) = configured {
        return WorkerId::new(id);
    }
    let host = pick_host_name(
        std::env::var("HOSTNAME").ok(),
        std::fs::read_to_string("/etc/hostname").ok(),
    );
    let suffix = host
        .map(|h| host_suffix(&h))
        .unwrap_or_else(|| format!("{:06x}", rand::random::<u32>() & 0xff_ffff));
    WorkerId::new(format!("{}-{}", prefix, suffix))
}

fn pick_host_name(env: Option<String>, file: Option<String>) -> Option<String> {
    env.into_iter()
        .chain(file)
        .map(|h| h.trim().to_string())
        .find(|h| !h.is_empty())
}

fn host_suffix(host: &str) -> String {
    let chars: Vec<char> = host.chars().collect();
    let start = chars.len().saturating_sub(6);
    chars[start..].iter().collect()
}

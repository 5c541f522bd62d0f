//! Kube Credentials issuance service: Entry point.
//!
//! Starts the issuance API with configuration from a TOML file, flags, and
//! environment variables.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use kubecred_core::{init_logging, resolve_worker_id, LogFormat, LoggingConfig};
use kubecred_issuance::{api, IssuanceConfig, IssuanceService};
use kubecred_store::{open_credential_store, StorageBackend};

/// Kube Credentials issuance service
#[derive(Parser)]
#[command(name = "kubecred-issuance", version, about = "Kube Credentials issuance service")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "KUBECRED_CONFIG", default_value = "kubecred-issuance.toml")]
    config: PathBuf,

    /// Override the listen port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Override the listen address.
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Worker id recorded on every issued credential.
    #[arg(long, env = "WORKER_ID")]
    worker_id: Option<String>,

    /// Shared HMAC secret.
    #[arg(long, env = "CREDENTIAL_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Storage engine (sqlite, rocksdb, memory).
    #[arg(long, env = "STORAGE_BACKEND")]
    storage_backend: Option<StorageBackend>,

    /// Database file or directory.
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

impl Args {
    fn apply(&self, config: &mut IssuanceConfig) {
        if let Some(port) = self.port {
            config.server.port = Some(port);
        }
        if let Some(ref addr) = self.listen_addr {
            config.server.listen_addr = addr.clone();
        }
        if let Some(ref id) = self.worker_id {
            config.server.worker_id = Some(id.clone());
        }
        if let Some(ref secret) = self.secret {
            config.hashing.secret = secret.clone();
        }
        if let Some(backend) = self.storage_backend {
            config.storage.backend = backend;
        }
        if let Some(ref path) = self.database_path {
            config.storage.path = path.clone();
        }
        self.apply_logging(&mut config.logging);
    }

    fn apply_logging(&self, logging: &mut LoggingConfig) {
        if let Some(ref level) = self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let defaults = IssuanceConfig::default();
        let mut logging = defaults.logging.clone();
        args.apply_logging(&mut logging);
        init_logging(&logging);
        defaults.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = IssuanceConfig::load(&args.config)?;
    args.apply(&mut config);
    init_logging(&config.logging);

    tracing::info!("Kube Credentials issuance service v{}", env!("CARGO_PKG_VERSION"));

    let worker_id = resolve_worker_id(config.server.worker_id.as_deref(), "worker")?;
    if config.hashing.is_dev_secret() {
        tracing::warn!("using the built-in development secret; set CREDENTIAL_SECRET in production");
    }
    let hasher = config.hashing.hasher()?;
    let store = open_credential_store(&config.storage)?;

    let service = Arc::new(IssuanceService::new(worker_id, hasher, store));
    let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;

    api::serve(listener, service, shutdown_signal()).await?;
    tracing::info!("issuance service exited cleanly");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

//! Kube Credentials verification service: Entry point.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use kubecred_core::{init_logging, resolve_worker_id, LogFormat, LoggingConfig};
use kubecred_store::{open_verification_log, StorageBackend};
use kubecred_verification::{api, HttpIssuanceClient, VerificationConfig, VerificationService};

/// Kube Credentials verification service
#[derive(Parser)]
#[command(name = "kubecred-verification", version, about = "Kube Credentials verification service")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "KUBECRED_CONFIG", default_value = "kubecred-verification.toml")]
    config: PathBuf,

    #[arg(long, env = "PORT")]
    port: Option<u16>,

    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Worker id named in verdicts and log entries.
    #[arg(long, env = "WORKER_ID")]
    worker_id: Option<String>,

    /// Shared HMAC secret; must match the issuance service.
    #[arg(long, env = "CREDENTIAL_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Base URL of the issuance service.
    #[arg(long, env = "ISSUANCE_SERVICE_URL")]
    issuance_url: Option<String>,

    /// Timeout for one issuance check, in milliseconds.
    #[arg(long, env = "PEER_TIMEOUT_MS")]
    peer_timeout_ms: Option<u64>,

    /// Storage engine (sqlite, rocksdb, memory).
    #[arg(long, env = "STORAGE_BACKEND")]
    storage_backend: Option<StorageBackend>,

    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

impl Args {
    fn apply(&self, config: &mut VerificationConfig) {
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
        if let Some(ref url) = self.issuance_url {
            config.peer.issuance_url = url.clone();
        }
        if let Some(ms) = self.peer_timeout_ms {
            config.peer.timeout_ms = ms;
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
        let defaults = VerificationConfig::default();
        let mut logging = defaults.logging.clone();
        args.apply_logging(&mut logging);
        init_logging(&logging);
        defaults.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = VerificationConfig::load(&args.config)?;
    args.apply(&mut config);
    init_logging(&config.logging);

    tracing::info!("Kube Credentials verification service v{}", env!("CARGO_PKG_VERSION"));

    let worker_id = resolve_worker_id(config.server.worker_id.as_deref(), "verification-worker")?;
    if config.hashing.is_dev_secret() {
        tracing::warn!("using the built-in development secret; set CREDENTIAL_SECRET in production");
    }
    let hasher = config.hashing.hasher()?;
    let log = open_verification_log(&config.storage)?;
    let issuance = HttpIssuanceClient::new(config.peer.issuance_url.clone(), config.peer.timeout())?;
    tracing::info!(
        issuance_url = %issuance.base_url(),
        timeout_ms = config.peer.timeout_ms,
        "issuance peer configured"
    );

    let service = Arc::new(VerificationService::new(
        worker_id,
        hasher,
        log,
        Arc::new(issuance),
    ));
    let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;

    api::serve(listener, service, shutdown_signal()).await?;
    tracing::info!("verification service exited cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

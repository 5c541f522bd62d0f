//! Harness for running both services on ephemeral ports inside a test.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use kubecred_core::{CredentialHasher, WorkerId};
use kubecred_issuance::IssuanceService;
use kubecred_store::{CredentialStore, MemoryStore, SqliteStore, VerificationLog};
use kubecred_verification::{HttpIssuanceClient, VerificationService};

pub const SECRET: &str = "integration-secret";

/// A service bound to `127.0.0.1:0` and running on the test runtime.
pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Trigger graceful shutdown and wait for the listener to close.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(5), &mut self.task).await;
        self.task.abort();
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    (listener, base_url)
}

fn hasher(secret: &str) -> CredentialHasher {
    CredentialHasher::new(secret).unwrap()
}

pub async fn spawn_issuance(worker: &str, store: Arc<dyn CredentialStore>) -> TestServer {
    let service = Arc::new(IssuanceService::new(
        WorkerId::new(worker).unwrap(),
        hasher(SECRET),
        store,
    ));
    let (listener, base_url) = bind().await;
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(kubecred_issuance::api::serve(listener, service, async move {
        let _ = rx.await;
    }));
    TestServer {
        base_url,
        shutdown: Some(tx),
        task,
    }
}

pub async fn spawn_verification(
    worker: &str,
    secret: &str,
    issuance_url: &str,
    log: Arc<dyn VerificationLog>,
) -> TestServer {
    let client = HttpIssuanceClient::new(issuance_url, Duration::from_secs(2)).unwrap();
    let service = Arc::new(VerificationService::new(
        WorkerId::new(worker).unwrap(),
        hasher(secret),
        log,
        Arc::new(client),
    ));
    let (listener, base_url) = bind().await;
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(kubecred_verification::api::serve(
        listener,
        service,
        async move {
            let _ = rx.await;
        },
    ));
    TestServer {
        base_url,
        shutdown: Some(tx),
        task,
    }
}

/// Issuance on W1 and verification on V1, both in memory.
pub struct Pair {
    pub issuance: TestServer,
    pub verification: TestServer,
    pub log: Arc<MemoryStore>,
}

pub async fn spawn_pair() -> Pair {
    let issuance = spawn_issuance("W1", Arc::new(MemoryStore::new())).await;
    let log = Arc::new(MemoryStore::new());
    let verification = spawn_verification("V1", SECRET, &issuance.base_url, log.clone()).await;
    Pair {
        issuance,
        verification,
        log,
    }
}

/// Unique scratch directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("kubecred-it-{}-{}", tag, rand::random::<u64>()))
}

pub fn open_sqlite(path: &std::path::Path) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(path).unwrap())
}

pub fn hash_of(plaintext: &str) -> String {
    hasher(SECRET).hash(plaintext).into_inner()
}

pub async fn post_json(url: String, body: serde_json::Value) -> (u16, serde_json::Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}

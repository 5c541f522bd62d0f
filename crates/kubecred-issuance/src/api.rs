//! HTTP API for the issuance service.
//!
//! `POST /issue`, `POST /check`, `GET /health_issue`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use kubecred_core::{string_field, ExistenceResult, ServiceError};

use crate::service::{IssuanceService, IssueReceipt};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Maps domain errors onto status codes and response bodies.
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid credential format"),
            ServiceError::AlreadyIssued => (StatusCode::BAD_REQUEST, "credential already issued"),
            ServiceError::StorageFailure(_) | ServiceError::PeerUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (
            status,
            Json(MessageResponse {
                message: message.into(),
            }),
        )
            .into_response()
    }
}

/// Extract a required string field, treating unparseable bodies as bad input.
fn required_field(
    body: Result<Json<serde_json::Value>, JsonRejection>,
    field: &str,
) -> Result<String, ServiceError> {
    let Json(value) = body.map_err(|e| ServiceError::InvalidInput(e.body_text()))?;
    Ok(string_field(&value, field)?.to_string())
}

/// Run a store-bound operation off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        ServiceError::StorageFailure(e.to_string())
    })?
}

// --- Handlers ---

async fn handle_health() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Issuance Service is running!".into(),
    })
}

async fn handle_issue(
    State(service): State<Arc<IssuanceService>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<IssueReceipt>, ApiError> {
    let credential = required_field(body, "credential")?;
    let receipt = blocking(move || service.issue(&credential)).await?;
    Ok(Json(receipt))
}

async fn handle_check(
    State(service): State<Arc<IssuanceService>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ExistenceResult>, ApiError> {
    let hash = required_field(body, "credential_hash")?;
    let result = blocking(move || service.check(&hash)).await?;
    Ok(Json(result))
}

// --- Server ---

pub fn build_router(service: Arc<IssuanceService>) -> Router {
    Router::new()
        .route("/health_issue", get(handle_health))
        .route("/issue", post(handle_issue))
        .route("/check", post(handle_check))
        .with_state(service)
}

/// Serve the API on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<IssuanceService>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let worker = service.worker_id().clone();
    let app = build_router(service);
    tracing::info!(%addr, %worker, "issuance API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

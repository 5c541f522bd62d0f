//! HTTP API for the verification service.
//!
//! `POST /verify`, `GET /history/{credential_hash}`, `GET /health_verify`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use kubecred_core::{string_field, CredentialHash, ServiceError, VerificationLogEntry, WorkerId};

use crate::service::{Verdict, VerificationService};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub worker: WorkerId,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub credential_hash: CredentialHash,
    pub entries: Vec<VerificationLogEntry>,
}

/// Server-side failure while verifying; keeps the verdict shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailedVerdict {
    is_valid: bool,
    message: String,
}

pub enum ApiError {
    /// Failure of `POST /verify`, reported on behalf of this worker.
    Verify(ServiceError, WorkerId),
    Other(ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let bad_request = || {
            (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse {
                    message: "invalid credential format".into(),
                }),
            )
                .into_response()
        };
        match self {
            ApiError::Verify(ServiceError::InvalidInput(_), _)
            | ApiError::Other(ServiceError::InvalidInput(_)) => bad_request(),
            ApiError::Verify(_, worker) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailedVerdict {
                    is_valid: false,
                    message: format!("verification error by {}", worker),
                }),
            )
                .into_response(),
            ApiError::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    message: "internal server error".into(),
                }),
            )
                .into_response(),
        }
    }
}

// --- Handlers ---

async fn handle_health(State(service): State<Arc<VerificationService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "verification",
        worker: service.worker_id().clone(),
    })
}

async fn handle_verify(
    State(service): State<Arc<VerificationService>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Verdict>, ApiError> {
    let worker = service.worker_id().clone();
    let Json(value) = body
        .map_err(|e| ApiError::Verify(ServiceError::InvalidInput(e.body_text()), worker.clone()))?;
    let credential = string_field(&value, "credential")
        .map_err(|e| ApiError::Verify(e.into(), worker.clone()))?;
    let verdict = service
        .verify(credential)
        .await
        .map_err(|e| ApiError::Verify(e, worker))?;
    Ok(Json(verdict))
}

async fn handle_history(
    State(service): State<Arc<VerificationService>>,
    Path(credential_hash): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let hash = CredentialHash::parse(&credential_hash)
        .map_err(|e| ApiError::Other(e.into()))?;
    let entries = service
        .history(hash.as_str())
        .await
        .map_err(ApiError::Other)?;
    Ok(Json(HistoryResponse {
        credential_hash: hash,
        entries,
    }))
}

// --- Server ---

pub fn build_router(service: Arc<VerificationService>) -> Router {
    Router::new()
        .route("/health_verify", get(handle_health))
        .route("/verify", post(handle_verify))
        .route("/history/{credential_hash}", get(handle_history))
        .with_state(service)
}

/// Serve the API on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<VerificationService>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let worker = service.worker_id().clone();
    let app = build_router(service);
    tracing::info!(%addr, %worker, "verification API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

//! Scheduled-job trigger server.
//!
//! A small HTTP surface for the external scheduler and for unsubscribe
//! links in digest emails:
//!
//! | Method   | Path                   | Description |
//! |----------|------------------------|-------------|
//! | `POST`   | `/jobs/run`            | Run synthesis, then the digest job if email is enabled |
//! | `DELETE` | `/subscriptions/{id}`  | Idempotent unsubscribe |
//! | `GET`    | `/health`              | Health check (returns version) |
//!
//! # Authentication
//!
//! `POST /jobs/run` compares the `Authorization` header against
//! `Bearer <RADAR_JOB_TOKEN>`. A missing or mismatched token is rejected
//! before any pipeline work begins.
//!
//! # Error Contract
//!
//! Error responses are JSON with a machine-readable code:
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "missing or invalid bearer token" } }
//! ```
//!
//! Codes: `unauthorized` (401), `internal` (500). The job endpoint itself
//! distinguishes only these two — partial pipeline failures are reported
//! inside the run summaries, not as HTTP errors.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::digest::{DigestOrchestrator, DigestReport};
use crate::jobs;
use crate::store::IdeaStore;
use crate::synthesis::{SynthesisOrchestrator, SynthesisReport};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn IdeaStore>,
    synthesis: Arc<SynthesisOrchestrator>,
    /// `None` when email is disabled; the job endpoint then runs synthesis
    /// only.
    digest: Option<Arc<DigestOrchestrator>>,
    job_token: String,
}

/// Start the trigger server on the configured bind address.
///
/// Requires the `RADAR_JOB_TOKEN` environment variable and refuses to
/// start without it.
pub async fn run_server(config: &Config, store: Arc<dyn IdeaStore>) -> Result<()> {
    let job_token = std::env::var("RADAR_JOB_TOKEN")
        .map_err(|_| anyhow::anyhow!("RADAR_JOB_TOKEN environment variable not set"))?;

    let synthesis = Arc::new(jobs::build_synthesis(config, store.clone())?);
    let digest = if config.email.is_enabled() {
        Some(Arc::new(jobs::build_digest(config, store.clone())?))
    } else {
        None
    };

    let state = AppState {
        store,
        synthesis,
        digest,
        job_token,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/jobs/run", post(handle_run_jobs))
        .route("/subscriptions/{id}", delete(handle_unsubscribe))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(bind = %config.server.bind, "trigger server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized() -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: "missing or invalid bearer token".to_string(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Bearer-token check for the job endpoint.
fn is_authorized(headers: &HeaderMap, expected_token: &str) -> bool {
    let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value == format!("Bearer {}", expected_token)
}

// ============ POST /jobs/run ============

#[derive(Serialize)]
struct RunJobsResponse {
    success: bool,
    synthesis: SynthesisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<DigestReport>,
}

/// Run the synthesis pipeline and, if email is configured, the digest job.
///
/// Both orchestrators return summaries rather than failing, so this
/// handler's only error paths are authorization and serialization.
async fn handle_run_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RunJobsResponse>, AppError> {
    if !is_authorized(&headers, &state.job_token) {
        return Err(unauthorized());
    }

    let synthesis = state.synthesis.run().await;

    let digest = match &state.digest {
        Some(orchestrator) => Some(orchestrator.run().await),
        None => None,
    };

    Ok(Json(RunJobsResponse {
        success: true,
        synthesis,
        digest,
    }))
}

// ============ DELETE /subscriptions/{id} ============

#[derive(Serialize)]
struct UnsubscribeResponse {
    success: bool,
}

/// Idempotent unsubscribe: deleting a missing id is still success.
async fn handle_unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UnsubscribeResponse>, AppError> {
    state
        .store
        .delete_subscription(id)
        .await
        .map_err(|e| internal(e.to_string()))?;

    info!(subscription = id, "unsubscribed");
    Ok(Json(UnsubscribeResponse { success: true }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert("authorization", HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn matching_bearer_token_is_authorized() {
        let headers = headers_with(Some("Bearer sekrit"));
        assert!(is_authorized(&headers, "sekrit"));
    }

    #[test]
    fn missing_header_is_rejected() {
        let headers = headers_with(None);
        assert!(!is_authorized(&headers, "sekrit"));
    }

    #[test]
    fn wrong_token_is_rejected() {
        let headers = headers_with(Some("Bearer wrong"));
        assert!(!is_authorized(&headers, "sekrit"));
    }

    #[test]
    fn bare_token_without_scheme_is_rejected() {
        let headers = headers_with(Some("sekrit"));
        assert!(!is_authorized(&headers, "sekrit"));
    }
}

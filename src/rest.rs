//! HTTP REST API for the audit service.
//!
//! Two routes carry the whole contract: `POST /audit` submits a URL and
//! returns the fresh report id plus the report; `GET /audit?id=…` retrieves a
//! stored report. Pipeline failures collapse to a generic 500 outward but are
//! logged with their internal kind tag.

use crate::error::AuditError;
use crate::orchestrator::Orchestrator;
use crate::store::ReportStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared handler state, owned by the composition root.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<ReportStore>,
}

/// Build the axum Router with all REST endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/audit", post(post_audit).get(get_audit))
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server on the given port.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("audit API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "reports_stored": state.store.len(),
        "retention_secs": state.store.retention().as_secs(),
    }))
}

#[derive(Deserialize)]
struct AuditRequest {
    url: String,
}

/// `POST /audit` — run a full audit of the submitted URL.
async fn post_audit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AuditRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(&AuditError::InvalidInput(format!(
                "malformed request body: {rejection}"
            )));
        }
    };

    match state.orchestrator.run_audit(&req.url).await {
        Ok((id, report)) => (
            StatusCode::OK,
            Json(json!({ "id": id, "results": report })),
        ),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize, Default)]
struct GetParams {
    id: Option<String>,
}

/// `GET /audit?id=…` — fetch a previously stored report.
async fn get_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetParams>,
) -> impl IntoResponse {
    let id = match params.id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "ID is required" })),
            );
        }
    };

    match state.store.get(&id) {
        Some(report) => (StatusCode::OK, Json(json!({ "results": report }))),
        // Absent and expired look the same. Expected outcome, not an error.
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Results not found" })),
        ),
    }
}

/// Map an [`AuditError`] to its HTTP response. Client errors surface their
/// message verbatim; pipeline failures get a generic message outward and a
/// kind-tagged log line inward.
fn error_response(err: &AuditError) -> (StatusCode, Json<Value>) {
    if err.is_client_error() {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
    } else {
        warn!(kind = err.kind(), "audit request failed: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to perform accessibility audit" })),
        )
    }
}

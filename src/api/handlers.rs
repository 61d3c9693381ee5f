// src/api/handlers.rs

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use tracing::debug;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::models::{ApiError, CreateScanRequest, HealthResponse};
use crate::core::models::{JobRecord, Principal};
use crate::core::orchestrator::{Admission, SubmitRequest};
use crate::core::scanner::availability::{ToolAvailability, check_scanners};

/// Header carrying the opaque caller identity set by an upstream gateway.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

fn principal_from(headers: &HeaderMap) -> Option<Principal> {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Principal(v.to_string()))
}

/// `POST /api/v1/scans`
pub async fn create_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Admission>), ApiError> {
    let Json(body) = payload?;
    let request = SubmitRequest::try_from(body)?;
    let admission = state.orchestrator.submit(request, principal_from(&headers)).await?;
    Ok((StatusCode::ACCEPTED, Json(admission)))
}

/// `GET /api/v1/scans/{id}`
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| {
        debug!(id = %id, "Malformed job id.");
        ApiError::not_found(format!("scan job {id} not found"))
    })?;
    let record = state.orchestrator.get_status(id).await?;
    Ok(Json(record))
}

/// `GET /api/v1/scanners`
pub async fn list_scanners(State(state): State<AppState>) -> Json<Vec<ToolAvailability>> {
    Json(check_scanners(&state.scanners).await)
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

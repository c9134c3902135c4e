//! Request handlers.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use workbench_core::{LanguageId, Strategy};

use crate::request::RunRequest;
use crate::response::{ApiError, RunResponse};
use crate::state::AppState;

/// Run a program and return its report.
#[instrument(skip(state, request), fields(language = %request.language))]
pub async fn run_code(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    request.validate().map_err(|reason| {
        warn!(reason = %reason, "Rejected run request");
        ApiError::bad_request(reason)
    })?;

    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    info!(request_id = %request_id, "Handling run request");

    let report = state
        .engine()
        .run(&request.source, &request.language, request.stdin)
        .await;

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        request_id = %request_id,
        status = ?report.status,
        duration_ms,
        "Run request completed"
    );

    Ok(Json(RunResponse::new(request_id, report, duration_ms)))
}

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
///
/// The server accepts runs in every runtime state; a cold runtime only makes
/// the first Python run slower.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine();
    let body = serde_json::json!({
        "status": "ready",
        "runtime": engine.runtime_state(),
        "remote_enabled": engine.remote_enabled(),
    });

    (StatusCode::OK, Json(body))
}

#[derive(Debug, Serialize)]
struct LanguageInfo {
    id: LanguageId,
    name: &'static str,
    extension: &'static str,
    strategy: Strategy,
}

/// List supported languages.
pub async fn list_languages(State(state): State<AppState>) -> impl IntoResponse {
    let languages: Vec<LanguageInfo> = state
        .engine()
        .supported_languages()
        .iter()
        .map(|&id| LanguageInfo {
            id,
            name: id.display_name(),
            extension: id.extension(),
            strategy: Strategy::for_language(id),
        })
        .collect();

    Json(serde_json::json!({
        "count": languages.len(),
        "languages": languages,
    }))
}

/// Starter program for a language.
pub async fn language_template(Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let language = id
        .parse::<LanguageId>()
        .map_err(|e| ApiError::not_found(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "language": language,
        "template": language.default_template(),
    })))
}

/// The current preview document with the applied stylesheet.
pub async fn preview(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    state
        .surface()
        .render()
        .map(Html)
        .ok_or_else(|| ApiError::not_found("No document has been opened"))
}

/// Start loading the embedded runtime in the background.
pub async fn preload_runtime(State(state): State<AppState>) -> impl IntoResponse {
    let runtime = state.engine().preload(LanguageId::Python);
    info!(state = ?runtime, "Runtime preload requested");

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "runtime": runtime })),
    )
}

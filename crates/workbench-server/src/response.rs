//! Response bodies produced by the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use workbench_core::ExecutionReport;

/// Body of a `POST /run` response.
///
/// The report is always returned with 200; its own `status` says how the
/// run went.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub report: ExecutionReport,
    /// Terminal rendering of the report.
    pub rendered: String,
    pub duration_ms: u64,
}

impl RunResponse {
    pub fn new(request_id: String, report: ExecutionReport, duration_ms: u64) -> Self {
        let rendered = report.render();
        Self {
            request_id,
            report,
            rendered,
            duration_ms,
        }
    }
}

/// Error response with a JSON `{"error": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{
    health_check, language_template, list_languages, preload_runtime, preview, readiness_check,
    run_code,
};
use crate::state::AppState;

/// Build the main application router.
///
/// Routes:
/// - `POST /run` - Run a program, returns the execution report
/// - `GET /languages` - Supported languages and their strategies
/// - `GET /languages/:id/template` - Starter program for a language
/// - `GET /preview` - Current HTML document with the applied stylesheet
/// - `POST /runtime/preload` - Warm up the embedded runtime
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness check
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let api_routes = Router::new()
        .route("/run", post(run_code))
        .route("/languages", get(list_languages))
        .route("/languages/:id/template", get(language_template))
        .route("/preview", get(preview))
        .route("/runtime/preload", post(preload_runtime));

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

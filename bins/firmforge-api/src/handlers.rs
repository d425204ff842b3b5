// HTTP route handlers for the firmforge API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use firmforge_common::types::{CompileRequest, SizeMetrics};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::compiler::{self, CompileError, CompileOutcome};
use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CompileSuccessResponse {
    pub success: bool,
    pub hex: String,
    pub output: String,
    pub size: SizeMetrics,
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /boards - Enumerate the supported board registry
pub async fn list_boards(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "boards": state.boards.all() }))
}

/// POST /compile - Run one compile job to completion
///
/// A sketch that fails to compile is a well-formed result (200 with
/// `success: false`), not a server error. Only validation problems (400) and
/// environment faults (500) use error status codes.
pub async fn compile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompileRequest>,
) -> impl IntoResponse {
    let timer = metrics::COMPILE_DURATION_SECONDS.start_timer();
    let result = compiler::run(&state.config, &state.boards, &state.compile_gate, payload).await;
    timer.observe_duration();

    match result {
        Ok(CompileOutcome::Success { hex, output, size }) => {
            metrics::COMPILE_REQUESTS.with_label_values(&["success"]).inc();
            (
                StatusCode::OK,
                Json(CompileSuccessResponse {
                    success: true,
                    hex,
                    output,
                    size,
                }),
            )
                .into_response()
        }
        Ok(CompileOutcome::Failure { error, output }) => {
            metrics::COMPILE_REQUESTS
                .with_label_values(&["compile_failed"])
                .inc();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "success": false,
                    "error": error,
                    "output": output,
                })),
            )
                .into_response()
        }
        Err(CompileError::Validation(message)) => {
            metrics::COMPILE_REQUESTS.with_label_values(&["rejected"]).inc();
            info!(error = %message, "Compile request rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "success": false,
                    "error": message,
                })),
            )
                .into_response()
        }
        Err(e) => {
            metrics::COMPILE_REQUESTS
                .with_label_values(&["internal_error"])
                .inc();
            error!(error = %e, "Compile job failed with internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_export() -> impl IntoResponse {
    let encoder = prometheus::TextEncoder::new();
    match encoder.encode_to_string(&prometheus::gather()) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response()
        }
    }
}

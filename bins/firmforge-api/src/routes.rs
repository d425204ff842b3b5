use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/boards", get(handlers::list_boards))
        .route("/compile", post(handlers::compile))
        .route("/metrics", get(handlers::metrics_export))
}

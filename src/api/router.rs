//! HTTP router

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::rag;
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the API router.
///
/// `metrics` adds the Prometheus scrape endpoint at `metrics_path`.
pub fn create_router(state: AppState, metrics: Option<(PrometheusMetrics, &str)>) -> Router {
    let mut router = Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Corrective RAG
        .route("/", get(rag::service_info))
        .route("/status", get(rag::status))
        .route("/upload/files", post(rag::upload_files))
        .route("/upload/directory", post(rag::upload_directory))
        .route("/query", post(rag::query))
        .route("/search", post(rag::search))
        .route("/reset", delete(rag::reset))
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http());

    if let Some((metrics, path)) = metrics {
        router = router.merge(create_metrics_router(metrics, path));
    }

    router
}

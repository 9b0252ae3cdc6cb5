//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::crag::{GradeResult, ThresholdMode};

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern is a valid regex")
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("numeric segment pattern is a valid regex"));

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("crag_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Parameters for query metrics
pub struct QueryMetricParams {
    pub threshold_mode: ThresholdMode,
    pub used_web_search: bool,
    pub success: bool,
    pub duration: Duration,
}

/// Record a completed (or failed) query
pub fn record_query(params: QueryMetricParams) {
    let labels = [
        ("threshold_mode", params.threshold_mode.to_string()),
        ("web_search", params.used_web_search.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("crag_queries_total", &labels).increment(1);
    histogram!("crag_query_duration_seconds", &labels).record(params.duration.as_secs_f64());
}

/// Record one passage grade
pub fn record_grade(grade: &GradeResult) {
    let outcome = match (grade.failed, grade.is_relevant()) {
        (true, _) => "failed",
        (false, true) => "relevant",
        (false, false) => "not_relevant",
    };

    counter!("crag_grades_total", "outcome" => outcome).increment(1);
}

/// Record a web fallback attempt
pub fn record_web_fallback(used: bool) {
    let outcome = if used { "used" } else { "failed" };
    counter!("crag_web_fallbacks_total", "outcome" => outcome).increment(1);
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let path = UUID_PATTERN.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(50).collect()
}

//! Observability configuration

use serde::Deserialize;

use crate::domain::DomainError;

/// Paths served by the API router; the metrics endpoint must not shadow them
const API_PATHS: [&str; 10] = [
    "/", "/health", "/ready", "/live", "/status", "/upload/files", "/upload/directory", "/query",
    "/search", "/reset",
];

/// Main observability configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Distributed tracing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Enable OpenTelemetry tracing export
    #[serde(default)]
    pub enabled: bool,
    /// OTLP endpoint (e.g., http://localhost:4317)
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Sampling ratio (0.0 to 1.0)
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

/// Prometheus metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "corrective-rag".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl ObservabilityConfig {
    /// Checked before the router is built, since a clashing route panics there
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.tracing.sampling_ratio) {
            return Err(DomainError::configuration(format!(
                "observability.tracing.sampling_ratio must be within [0, 1], got {}",
                self.tracing.sampling_ratio
            )));
        }

        let path = self.metrics.path.as_str();
        if self.metrics.enabled && (!path.starts_with('/') || API_PATHS.contains(&path)) {
            return Err(DomainError::configuration(format!(
                "observability.metrics.path '{}' must start with '/' and not reuse an API route",
                path
            )));
        }

        Ok(())
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

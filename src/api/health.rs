//! Liveness and readiness endpoints

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Simple health check - returns 200 if the service is running
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check.
///
/// Unhealthy when the service failed to initialize; degraded while the passage
/// store is still empty, since uploads are accepted but queries are not.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let check = check_passage_store(&state).await;
    let overall_status = check.status;

    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![check]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_passage_store(state: &AppState) -> HealthCheck {
    let name = "passage_store".to_string();

    let rag = match state.rag() {
        Ok(rag) => rag,
        Err(e) => {
            return HealthCheck {
                name,
                status: HealthStatus::Unhealthy,
                message: Some(e.response.error.message),
            }
        }
    };

    match rag.status().await {
        Ok(info) if info.document_count > 0 => HealthCheck {
            name,
            status: HealthStatus::Healthy,
            message: Some(format!("{} passages", info.document_count)),
        },
        Ok(_) => HealthCheck {
            name,
            status: HealthStatus::Degraded,
            message: Some("No documents ingested yet".to_string()),
        },
        Err(e) => HealthCheck {
            name,
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    }
}

//! Request logging middleware

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers worth a debug line; credentials are masked
const LOGGED_HEADERS: &[&str] = &["content-type", "content-length", "user-agent", "authorization"];

/// Log each request and its completion.
///
/// No span is created here; `TraceLayer` owns the request span.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = route_path(&request);
    let request_id = request_id(request.headers());

    debug!(
        request_id = %request_id,
        headers = %summarize_headers(request.headers()),
        "{} {}", method, path
    );

    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        warn!(request_id = %request_id, status = status.as_u16(), duration_ms, "{} {} failed", method, path);
    } else {
        info!(request_id = %request_id, status = status.as_u16(), duration_ms, "{} {}", method, path);
    }

    response
}

fn route_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn summarize_headers(headers: &HeaderMap) -> String {
    LOGGED_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?;
            let shown = if *name == "authorization" {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[invalid]")
            };
            Some(format!("{}={}", name, shown))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

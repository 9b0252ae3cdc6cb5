//! HTTP middleware

mod logging;
mod metrics;

pub use logging::logging_middleware;
pub use metrics::metrics_middleware;

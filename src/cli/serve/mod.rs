//! Serve command - runs the HTTP API server

use std::net::SocketAddr;

use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::api::{create_router, AppState};
use crate::config::AppConfig;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};
use crate::infrastructure::services::CorrectiveRagService;

/// Arguments for the serve command
#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Run the API server.
///
/// A service that fails to initialize does not stop the server; the
/// endpoints that need it answer 503 with the startup error.
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    config.observability.validate()?;
    init_tracing(&config.logging, &config.observability.tracing);

    let state = match CorrectiveRagService::from_config(&config).await {
        Ok(service) => {
            info!("Corrective RAG service initialized");
            AppState::new(std::sync::Arc::new(service))
        }
        Err(e) => {
            error!("Failed to initialize RAG system: {}", e);
            AppState::uninitialized(e.to_string())
        }
    };

    let metrics = init_metrics(&config.observability.metrics);
    let metrics_path = config.observability.metrics.path.clone();
    let app = create_router(state, metrics.map(|m| (m, metrics_path.as_str())));

    let addr = build_socket_addr(&config, args.port)?;
    info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig, port: Option<u16>) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        port.unwrap_or(config.server.port),
    )))
}

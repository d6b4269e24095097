//! Application builder: picks the stores, starts the realtime engine and
//! serves the router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use orkut_core::config::AppConfig;
use orkut_core::error::AppError;
use orkut_database::{DatabasePool, MemoryStore};
use orkut_realtime::RealtimeEngine;

use crate::router::build_router;
use crate::state::{AppState, Stores};

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the server until Ctrl-C or SIGTERM.
///
/// An empty `database.url` keeps everything in memory.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!("Starting Orkut call server...");

    let (stores, pool) = if config.database.url.trim().is_empty() {
        warn!("No database URL configured, using the in-memory store");
        (Stores::memory(Arc::new(MemoryStore::new())), None)
    } else {
        let pool = DatabasePool::connect(&config.database).await?;
        (Stores::postgres(&pool), Some(pool))
    };

    let realtime = Arc::new(RealtimeEngine::new(config.realtime.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::configuration(format!("Invalid server address: {e}")))?;

    let state = AppState::new(config, stores, realtime.clone());
    let app = build_app(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    realtime.shutdown().await?;
    if let Some(pool) = pool {
        pool.close().await;
    }
    info!("Orkut call server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! Top-level real-time engine that ties together the hub and connections.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use orkut_core::config::RealtimeConfig;
use orkut_core::error::AppError;

use crate::connection::manager::ConnectionManager;
use crate::hub::MemoryHub;

/// Owns the hub every WebSocket connection and server-side publisher shares.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Topic hub.
    pub hub: MemoryHub,
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("topics", &self.hub.topic_count())
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates the engine.
    pub fn new(config: RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let hub = MemoryHub::new(config.channel_buffer_size);
        let connections = Arc::new(ConnectionManager::new(config, hub.clone()));

        info!("Real-time engine initialized");

        Self {
            hub,
            connections,
            shutdown_tx,
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        let _ = self.shutdown_tx.send(());
        self.connections.close_all().await;

        info!("Real-time engine shut down");
        Ok(())
    }
}

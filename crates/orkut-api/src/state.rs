//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use orkut_auth::jwt::JwtDecoder;
use orkut_core::config::AppConfig;
use orkut_database::repositories::{
    CallSignalRepository, NotificationRepository, PresenceRepository, ProfileRepository,
};
use orkut_database::{
    CallSignalStore, DatabasePool, MemoryStore, NotificationStore, PresenceStore, ProfileStore,
};
use orkut_realtime::server::RealtimeEngine;

/// The persistence backends handlers talk to.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub presence: Arc<dyn PresenceStore>,
    pub signals: Arc<dyn CallSignalStore>,
}

impl Stores {
    /// Every store backed by one in-memory instance.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            profiles: store.clone(),
            notifications: store.clone(),
            presence: store.clone(),
            signals: store,
        }
    }

    /// PostgreSQL repositories sharing `pool`.
    pub fn postgres(pool: &DatabasePool) -> Self {
        let pool = pool.pool().clone();
        Self {
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            presence: Arc::new(PresenceRepository::new(pool.clone())),
            signals: Arc::new(CallSignalRepository::new(pool)),
        }
    }
}

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// JWT token decoder and validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Persistence
    pub stores: Stores,
    /// Realtime hub and WebSocket connections
    pub realtime: Arc<RealtimeEngine>,
    /// Process start, for the health route
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores, realtime: Arc<RealtimeEngine>) -> Self {
        Self {
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            config: Arc::new(config),
            stores,
            realtime,
            started_at: Instant::now(),
        }
    }
}

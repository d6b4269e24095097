//! Call signal repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use orkut_core::error::{AppError, ErrorKind};
use orkut_core::result::AppResult;

use crate::models::{CallSignal, NewCallSignal};
use crate::store::CallSignalStore;

/// Append-only repository for `call_signals`.
#[derive(Debug, Clone)]
pub struct CallSignalRepository {
    pool: PgPool,
}

impl CallSignalRepository {
    /// Create a new call signal repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallSignalStore for CallSignalRepository {
    async fn insert_signal(&self, new: NewCallSignal) -> AppResult<CallSignal> {
        sqlx::query_as::<_, CallSignal>(
            "INSERT INTO call_signals (from_user_id, to_user_id, signal_type, signal_data) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(new.from_user_id)
        .bind(new.to_user_id)
        .bind(&new.signal_type)
        .bind(&new.signal_data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create call signal", e))
    }
}

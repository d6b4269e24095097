//! Persisted presence repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use orkut_core::error::{AppError, ErrorKind};
use orkut_core::result::AppResult;
use orkut_core::types::UserId;

use crate::models::PresenceRow;
use crate::store::PresenceStore;

const SELECT_WITH_PROFILE: &str = "SELECT p.user_id, p.is_online, p.last_seen, \
     pr.username, pr.display_name, pr.photo_url \
     FROM user_presence p LEFT JOIN profiles pr ON pr.id = p.user_id";

/// Repository for `user_presence`.
#[derive(Debug, Clone)]
pub struct PresenceRepository {
    pool: PgPool,
}

impl PresenceRepository {
    /// Create a new presence repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceStore for PresenceRepository {
    async fn find_presence(&self, user_id: UserId) -> AppResult<Option<PresenceRow>> {
        sqlx::query_as::<_, PresenceRow>(&format!("{SELECT_WITH_PROFILE} WHERE p.user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find presence", e))
    }

    async fn list_online(&self, since: DateTime<Utc>) -> AppResult<Vec<PresenceRow>> {
        sqlx::query_as::<_, PresenceRow>(&format!(
            "{SELECT_WITH_PROFILE} WHERE p.is_online = TRUE AND p.last_seen >= $1 \
             ORDER BY p.last_seen DESC"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list online users", e))
    }

    async fn upsert_presence(&self, user_id: UserId, is_online: bool) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_presence (user_id, is_online, last_seen) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET is_online = $2, last_seen = NOW()",
        )
        .bind(user_id)
        .bind(is_online)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert presence", e))?;
        Ok(())
    }
}

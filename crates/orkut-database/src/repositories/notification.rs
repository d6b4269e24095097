//! Notification repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use orkut_core::error::{AppError, ErrorKind};
use orkut_core::result::AppResult;
use orkut_core::types::{NotificationId, UserId};

use crate::models::{INCOMING_CALL, NewNotification, Notification};
use crate::store::NotificationStore;

/// Repository for the `notifications` table.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (profile_id, type, payload, read) \
             VALUES ($1, $2, $3, FALSE) RETURNING *",
        )
        .bind(new.profile_id)
        .bind(&new.kind)
        .bind(&new.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create notification", e))
    }

    async fn find_incoming_call(
        &self,
        profile_id: UserId,
        call_id: &str,
    ) -> AppResult<Option<Notification>> {
        let filter = serde_json::json!({ "call_id": call_id });
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications \
             WHERE profile_id = $1 AND type = $2 AND payload @> $3 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(profile_id)
        .bind(INCOMING_CALL)
        .bind(&filter)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find call notification", e)
        })
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(())
    }
}

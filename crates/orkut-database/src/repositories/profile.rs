//! Profile repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use orkut_core::error::{AppError, ErrorKind};
use orkut_core::result::AppResult;
use orkut_core::types::UserId;

use crate::models::Profile;
use crate::store::ProfileStore;

/// Read-only repository for `profiles`.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find_profile(&self, id: UserId) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, username, display_name, photo_url FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find profile", e))
    }
}

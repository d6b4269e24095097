//! Store traits consumed by the HTTP layer.
//!
//! Each trait is implemented by a PostgreSQL repository in
//! [`crate::repositories`] and by [`crate::memory::MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use orkut_core::result::AppResult;
use orkut_core::types::{NotificationId, UserId};

use crate::models::{
    CallSignal, NewCallSignal, NewNotification, Notification, PresenceRow, Profile,
};

/// Read access to public profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Look up a profile by user id.
    async fn find_profile(&self, id: UserId) -> AppResult<Option<Profile>>;
}

/// Notification rows keyed by recipient.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Insert a notification and return the stored row.
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification>;

    /// Find the `incoming_call` notification for `call_id` addressed to `profile_id`.
    async fn find_incoming_call(
        &self,
        profile_id: UserId,
        call_id: &str,
    ) -> AppResult<Option<Notification>>;

    /// Flag a notification as read.
    async fn mark_read(&self, id: NotificationId) -> AppResult<()>;
}

/// Persisted online/offline flags.
#[async_trait]
pub trait PresenceStore: Send + Sync + 'static {
    /// Presence row for one user.
    async fn find_presence(&self, user_id: UserId) -> AppResult<Option<PresenceRow>>;

    /// Users flagged online whose `last_seen` is at or after `since`, newest first.
    async fn list_online(&self, since: DateTime<Utc>) -> AppResult<Vec<PresenceRow>>;

    /// Insert or update the caller's flag, stamping `last_seen` with now.
    async fn upsert_presence(&self, user_id: UserId, is_online: bool) -> AppResult<()>;
}

/// Append-only signaling records.
#[async_trait]
pub trait CallSignalStore: Send + Sync + 'static {
    /// Insert a signal row.
    async fn insert_signal(&self, new: NewCallSignal) -> AppResult<CallSignal>;
}

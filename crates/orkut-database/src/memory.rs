//! In-memory implementation of every store trait.
//!
//! Backs the server when no database URL is configured and is the store
//! used by the API tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;

use orkut_core::error::AppError;
use orkut_core::result::AppResult;
use orkut_core::types::{CallSignalId, NotificationId, UserId};

use crate::models::{
    CallSignal, INCOMING_CALL, NewCallSignal, NewNotification, Notification, PresenceRow, Profile,
};
use crate::store::{CallSignalStore, NotificationStore, PresenceStore, ProfileStore};

#[derive(Debug, Clone)]
struct PresenceEntry {
    is_online: bool,
    last_seen: DateTime<Utc>,
}

/// DashMap-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<UserId, Profile>,
    notifications: DashMap<NotificationId, Notification>,
    presence: DashMap<UserId, PresenceEntry>,
    signals: Mutex<Vec<CallSignal>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile.
    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    /// Set a presence row with an explicit `last_seen`.
    pub fn set_presence(&self, user_id: UserId, is_online: bool, last_seen: DateTime<Utc>) {
        self.presence.insert(
            user_id,
            PresenceEntry {
                is_online,
                last_seen,
            },
        );
    }

    /// All notifications addressed to `profile_id`, oldest first.
    pub fn notifications_for(&self, profile_id: UserId) -> Vec<Notification> {
        let mut rows: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.profile_id == profile_id)
            .map(|n| n.value().clone())
            .collect();
        rows.sort_by_key(|n| n.created_at);
        rows
    }

    /// Every persisted call signal, in insertion order.
    pub fn signals(&self) -> Vec<CallSignal> {
        self.signals
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn presence_row(&self, user_id: UserId, entry: &PresenceEntry) -> PresenceRow {
        let profile = self.profiles.get(&user_id);
        PresenceRow {
            user_id,
            is_online: entry.is_online,
            last_seen: entry.last_seen,
            username: profile.as_ref().and_then(|p| p.username.clone()),
            display_name: profile.as_ref().and_then(|p| p.display_name.clone()),
            photo_url: profile.as_ref().and_then(|p| p.photo_url.clone()),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, id: UserId) -> AppResult<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> AppResult<Notification> {
        let row = Notification {
            id: NotificationId::new(),
            profile_id: new.profile_id,
            kind: new.kind,
            payload: new.payload,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_incoming_call(
        &self,
        profile_id: UserId,
        call_id: &str,
    ) -> AppResult<Option<Notification>> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.profile_id == profile_id && n.kind == INCOMING_CALL)
            .filter(|n| n.payload.get("call_id").and_then(|v| v.as_str()) == Some(call_id))
            .max_by_key(|n| n.created_at)
            .map(|n| n.value().clone()))
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<()> {
        match self.notifications.get_mut(&id) {
            Some(mut row) => {
                row.read = true;
                Ok(())
            }
            None => Err(AppError::not_found(format!("Notification {id} not found"))),
        }
    }
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn find_presence(&self, user_id: UserId) -> AppResult<Option<PresenceRow>> {
        Ok(self
            .presence
            .get(&user_id)
            .map(|entry| self.presence_row(user_id, entry.value())))
    }

    async fn list_online(&self, since: DateTime<Utc>) -> AppResult<Vec<PresenceRow>> {
        let mut rows: Vec<PresenceRow> = self
            .presence
            .iter()
            .filter(|e| e.is_online && e.last_seen >= since)
            .map(|e| self.presence_row(*e.key(), e.value()))
            .collect();
        rows.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(rows)
    }

    async fn upsert_presence(&self, user_id: UserId, is_online: bool) -> AppResult<()> {
        self.set_presence(user_id, is_online, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl CallSignalStore for MemoryStore {
    async fn insert_signal(&self, new: NewCallSignal) -> AppResult<CallSignal> {
        let row = CallSignal {
            id: CallSignalId::new(),
            from_user_id: new.from_user_id,
            to_user_id: new.to_user_id,
            signal_type: new.signal_type,
            signal_data: new.signal_data,
            created_at: Utc::now(),
        };
        let mut signals = self
            .signals
            .lock()
            .map_err(|_| AppError::internal("call signal store poisoned"))?;
        signals.push(row.clone());
        Ok(row)
    }
}

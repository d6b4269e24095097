//! Row types for the call-related tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orkut_core::types::{CallSignalId, CallType, NotificationId, UserId};

/// Notification `type` used for call invitations.
pub const INCOMING_CALL: &str = "incoming_call";

/// Public profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Profile {
    /// Name shown in call prompts, falling back to the username.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| "Usuário".to_string())
    }
}

/// A stored notification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient.
    pub profile_id: UserId,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for [`Notification`].
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub profile_id: UserId,
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Payload of an `incoming_call` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCallPayload {
    pub call_id: String,
    pub call_type: CallType,
    pub from_user: Profile,
    pub offer: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted online flag joined with profile fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PresenceRow {
    pub user_id: UserId,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// A persisted signaling record written by the HTTP fallback.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CallSignal {
    pub id: CallSignalId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub signal_type: String,
    pub signal_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for [`CallSignal`].
#[derive(Debug, Clone)]
pub struct NewCallSignal {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub signal_type: String,
    pub signal_data: serde_json::Value,
}

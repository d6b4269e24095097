//! Presence records as published on the presence topic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orkut_core::result::AppResult;
use orkut_core::types::UserId;

/// What a user is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    /// Recent input.
    Active,
    /// No input for a while.
    Away,
    /// Explicitly unavailable.
    Busy,
    /// On a call.
    InCall,
}

/// One user's presence, as tracked and as seen by others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Local view only; peers are online while their meta is tracked.
    #[serde(rename = "isOnline", default)]
    pub is_online: bool,
    #[serde(rename = "lastSeen", default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
    #[serde(rename = "isAvailableForCalls", default = "default_available")]
    pub is_available_for_calls: bool,
    #[serde(rename = "currentActivity", default)]
    pub current_activity: Option<Activity>,
}

fn default_available() -> bool {
    true
}

impl PresenceRecord {
    /// Whether this user can be called: online, available, and not on a call.
    pub fn is_callable(&self) -> bool {
        self.is_online
            && self.is_available_for_calls
            && self.current_activity != Some(Activity::InCall)
    }
}

/// The `presence_update` broadcast payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "lastSeen")]
    pub last_seen: DateTime<Utc>,
    #[serde(rename = "isAvailableForCalls")]
    pub is_available_for_calls: bool,
    #[serde(rename = "currentActivity")]
    pub current_activity: Activity,
}

/// Profile fields carried in the tracked record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Looks up the profile fields of the local user.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, user_id: UserId) -> AppResult<Option<ProfileSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let id = UserId::new();
        let record = PresenceRecord {
            user_id: id,
            username: Some("ana".to_string()),
            display_name: None,
            photo_url: None,
            is_online: true,
            last_seen: Utc::now(),
            is_available_for_calls: true,
            current_activity: Some(Activity::InCall),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], json!(id.to_string()));
        assert_eq!(value["currentActivity"], "in-call");
        assert_eq!(value["isAvailableForCalls"], true);
        assert!(value.get("display_name").is_none());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let id = UserId::new();
        let record: PresenceRecord =
            serde_json::from_value(json!({ "userId": id.to_string() })).unwrap();
        assert!(record.is_available_for_calls);
        assert!(!record.is_online);
        assert_eq!(record.current_activity, None);
    }

    #[test]
    fn test_in_call_is_never_callable() {
        let record = PresenceRecord {
            user_id: UserId::new(),
            username: None,
            display_name: None,
            photo_url: None,
            is_online: true,
            last_seen: Utc::now(),
            is_available_for_calls: true,
            current_activity: Some(Activity::InCall),
        };
        assert!(!record.is_callable());
    }
}

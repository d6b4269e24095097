//! Request DTOs.
//!
//! Fields are optional so missing values surface as the route's own 400
//! message instead of a deserializer rejection.

use serde::Deserialize;

/// `POST /api/call-notification`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotificationRequest {
    #[serde(default)]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub call_type: Option<String>,
    /// SDP offer forwarded untouched.
    #[serde(default)]
    pub offer: Option<serde_json::Value>,
}

/// `PUT /api/call-notification`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponseRequest {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub answer: Option<serde_json::Value>,
}

/// `POST /api/presence`
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceActionRequest {
    #[serde(default)]
    pub action: Option<String>,
}

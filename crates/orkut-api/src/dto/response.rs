//! Response DTOs.

use serde::{Deserialize, Serialize};

use orkut_database::models::{PresenceRow, Profile};

/// Reply to a call notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotificationResponse {
    pub success: bool,
    pub message: String,
    pub call_id: String,
    pub target_user: Profile,
}

/// Reply to an accept/reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallActionResponse {
    pub success: bool,
    pub message: String,
    pub action: String,
}

/// Online users, newest activity first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersResponse {
    pub success: bool,
    pub data: Vec<PresenceRow>,
    pub count: usize,
}

/// Generic `{ success, message }` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub ws_connections: usize,
    pub online_users: usize,
    pub topics: usize,
}

//! Events delivered to channel members.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Presence key → tracked metas, in join order.
pub type PresenceState = HashMap<String, Vec<serde_json::Value>>;

/// Something that happened on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HubEvent {
    /// A broadcast from another member.
    Broadcast {
        /// Application event name.
        event: String,
        /// Event payload.
        payload: serde_json::Value,
    },
    /// Full presence snapshot.
    Sync {
        /// Current presence state.
        state: PresenceState,
    },
    /// A member started (or refreshed) tracking.
    Join {
        /// Presence key.
        key: String,
        /// Metas added under the key.
        new_presences: Vec<serde_json::Value>,
    },
    /// A member stopped tracking or left the topic.
    Leave {
        /// Presence key.
        key: String,
        /// Metas removed from the key.
        left_presences: Vec<serde_json::Value>,
    },
}

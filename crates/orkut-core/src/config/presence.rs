//! Presence tracker configuration.

use serde::{Deserialize, Serialize};

/// Heartbeat cadence and activity thresholds for the presence tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Topic shared by every client's presence record.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Seconds between heartbeat re-publications.
    #[serde(default = "default_heartbeat")]
    pub heartbeat_seconds: u64,
    /// Idle seconds after which a user stops being `active`.
    #[serde(default = "default_away_after")]
    pub away_after_seconds: u64,
    /// Idle seconds of the second idle threshold.
    #[serde(default = "default_long_away_after")]
    pub long_away_after_seconds: u64,
    /// Window used by the HTTP presence listing, in seconds.
    #[serde(default = "default_online_window")]
    pub online_window_seconds: i64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            heartbeat_seconds: default_heartbeat(),
            away_after_seconds: default_away_after(),
            long_away_after_seconds: default_long_away_after(),
            online_window_seconds: default_online_window(),
        }
    }
}

fn default_topic() -> String {
    "user_presence".to_string()
}

fn default_heartbeat() -> u64 {
    30
}

fn default_away_after() -> u64 {
    60
}

fn default_long_away_after() -> u64 {
    300
}

fn default_online_window() -> i64 {
    300
}

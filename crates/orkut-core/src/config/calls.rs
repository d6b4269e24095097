//! Call signaling configuration.

use serde::{Deserialize, Serialize};

/// One ICE server entry handed to the peer connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    /// Server URLs (`stun:` or `turn:`).
    pub urls: Vec<String>,
    /// TURN username.
    #[serde(default)]
    pub username: Option<String>,
    /// TURN credential.
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    /// A credential-less STUN entry.
    pub fn stun(url: &str) -> Self {
        Self {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }
}

/// Call signaling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    /// ICE servers. Only public STUN by default; no TURN relay is configured.
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<IceServerConfig>,
    /// Answer inbound offers immediately instead of ringing.
    #[serde(default)]
    pub auto_answer: bool,
    /// Seconds an incoming-call prompt rings before auto-rejecting.
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: u32,
    /// Prefix of the per-room signaling topic.
    #[serde(default = "default_room_prefix")]
    pub room_topic_prefix: String,
    /// Milliseconds the fallback route keeps its throwaway channel open.
    #[serde(default = "default_rebroadcast_linger")]
    pub rebroadcast_linger_ms: u64,
    /// Require the callee's persisted online flag before notifying.
    #[serde(default)]
    pub require_callee_online: bool,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            auto_answer: false,
            ring_timeout_seconds: default_ring_timeout(),
            room_topic_prefix: default_room_prefix(),
            rebroadcast_linger_ms: default_rebroadcast_linger(),
            require_callee_online: false,
        }
    }
}

fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![
        IceServerConfig::stun("stun:stun.l.google.com:19302"),
        IceServerConfig::stun("stun:stun1.l.google.com:19302"),
    ]
}

fn default_ring_timeout() -> u32 {
    30
}

fn default_room_prefix() -> String {
    "audio-call-".to_string()
}

fn default_rebroadcast_linger() -> u64 {
    1000
}

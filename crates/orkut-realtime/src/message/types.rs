//! Inbound and outbound WebSocket message type definitions.

use serde::{Deserialize, Serialize};

use crate::hub::{HubEvent, PresenceState};

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Join a topic.
    Join {
        /// Topic name.
        topic: String,
        /// Presence key; must be the caller's own user id when given.
        #[serde(default)]
        presence_key: Option<String>,
    },
    /// Leave a topic.
    Leave {
        /// Topic name.
        topic: String,
    },
    /// Broadcast an event to the other members of a topic.
    Broadcast {
        /// Topic name.
        topic: String,
        /// Event name.
        event: String,
        /// Event payload.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Publish the caller's presence meta on a topic.
    Track {
        /// Topic name.
        topic: String,
        /// Presence meta.
        payload: serde_json::Value,
    },
    /// Withdraw the caller's presence meta.
    Untrack {
        /// Topic name.
        topic: String,
    },
    /// Client keepalive.
    Heartbeat,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Join confirmed.
    Joined {
        /// Topic name.
        topic: String,
    },
    /// Leave confirmed.
    Left {
        /// Topic name.
        topic: String,
    },
    /// Broadcast from another member.
    Broadcast {
        /// Topic name.
        topic: String,
        /// Event name.
        event: String,
        /// Event payload.
        payload: serde_json::Value,
    },
    /// Full presence snapshot.
    PresenceState {
        /// Topic name.
        topic: String,
        /// Presence key → metas.
        state: PresenceState,
    },
    /// Presence joins and leaves.
    PresenceDiff {
        /// Topic name.
        topic: String,
        /// Added metas.
        joins: PresenceState,
        /// Removed metas.
        leaves: PresenceState,
    },
    /// Ping (server keepalive).
    Ping {
        /// Server timestamp.
        timestamp: i64,
    },
    /// Error message.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Builds an error message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Maps a hub event on `topic` to its wire form.
    pub fn from_hub_event(topic: &str, event: HubEvent) -> Self {
        let topic = topic.to_string();
        match event {
            HubEvent::Broadcast { event, payload } => Self::Broadcast {
                topic,
                event,
                payload,
            },
            HubEvent::Sync { state } => Self::PresenceState { topic, state },
            HubEvent::Join { key, new_presences } => Self::PresenceDiff {
                topic,
                joins: PresenceState::from([(key, new_presences)]),
                leaves: PresenceState::new(),
            },
            HubEvent::Leave {
                key,
                left_presences,
            } => Self::PresenceDiff {
                topic,
                joins: PresenceState::new(),
                leaves: PresenceState::from([(key, left_presences)]),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_join_parses_without_presence_key() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"type":"join","topic":"audio-call-r1"}"#).unwrap();
        assert!(matches!(
            msg,
            InboundMessage::Join { topic, presence_key: None } if topic == "audio-call-r1"
        ));
    }

    #[test]
    fn test_heartbeat_parses() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Heartbeat));
    }

    #[test]
    fn test_leave_event_maps_to_presence_diff() {
        let out = OutboundMessage::from_hub_event(
            "user_presence",
            HubEvent::Leave {
                key: "u1".to_string(),
                left_presences: vec![json!({ "userId": "u1" })],
            },
        );
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["type"], "presence_diff");
        assert_eq!(value["leaves"]["u1"][0]["userId"], "u1");
        assert!(value["joins"].as_object().unwrap().is_empty());
    }
}

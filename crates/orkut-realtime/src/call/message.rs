//! Signaling messages exchanged on a call room channel.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use orkut_core::types::UserId;

/// Broadcast event names used on a call room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    CallOffer,
    CallAnswer,
    IceCandidate,
    CallEnd,
    CallReject,
}

impl SignalEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CallOffer => "call-offer",
            Self::CallAnswer => "call-answer",
            Self::IceCandidate => "ice-candidate",
            Self::CallEnd => "call-end",
            Self::CallReject => "call-reject",
        }
    }

    pub fn parse(event: &str) -> Option<Self> {
        match event {
            "call-offer" => Some(Self::CallOffer),
            "call-answer" => Some(Self::CallAnswer),
            "ice-candidate" => Some(Self::IceCandidate),
            "call-end" => Some(Self::CallEnd),
            "call-reject" => Some(Self::CallReject),
            _ => None,
        }
    }
}

/// Payload of every signaling event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    pub call_id: String,
    pub from: UserId,
    pub to: UserId,
    /// SDP for offers and answers, a candidate for ICE, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl SignalMessage {
    pub fn new(call_id: &str, from: UserId, to: UserId, data: Option<serde_json::Value>) -> Self {
        Self {
            call_id: call_id.to_string(),
            from,
            to,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Whether the local user should act on this message.
    pub fn is_addressed_to(&self, local: UserId) -> bool {
        self.to == local && self.from != local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        for event in [
            SignalEvent::CallOffer,
            SignalEvent::CallAnswer,
            SignalEvent::IceCandidate,
            SignalEvent::CallEnd,
            SignalEvent::CallReject,
        ] {
            assert_eq!(SignalEvent::parse(event.as_str()), Some(event));
        }
        assert_eq!(SignalEvent::parse("incoming-call"), None);
    }

    #[test]
    fn test_end_message_has_no_data() {
        let (a, b) = (UserId::new(), UserId::new());
        let value = serde_json::to_value(SignalMessage::new("room", a, b, None)).unwrap();
        assert_eq!(value["callId"], "room");
        assert!(value.get("data").is_none());
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_addressing() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let msg = SignalMessage::new("room", a, b, Some(json!({})));
        assert!(msg.is_addressed_to(b));
        assert!(!msg.is_addressed_to(a));
        assert!(!msg.is_addressed_to(c));
        assert!(!SignalMessage::new("room", b, b, None).is_addressed_to(b));
    }
}

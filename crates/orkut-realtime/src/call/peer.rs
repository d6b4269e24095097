//! Peer connection abstraction.
//!
//! The WebRTC engine itself (ICE, DTLS, SRTP) sits behind
//! [`PeerConnection`]; sessions only drive the offer/answer exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use orkut_core::config::{CallsConfig, IceServerConfig};
use orkut_core::result::AppResult;

use super::media::{MediaStream, MediaTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// An SDP offer or answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

/// A trickled ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
}

/// Transport state reported by the peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events raised by a peer connection.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local candidate was gathered.
    IceCandidate(IceCandidate),
    /// Remote media arrived.
    Track(MediaStream),
    /// The transport changed state.
    ConnectionState(ConnectionState),
}

/// ICE configuration handed to the factory.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl From<&CallsConfig> for PeerConfig {
    fn from(config: &CallsConfig) -> Self {
        Self {
            ice_servers: config.ice_servers.clone(),
        }
    }
}

/// One peer-to-peer media session.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_track(&self, track: MediaTrack, stream: &MediaStream) -> AppResult<()>;
    async fn create_offer(&self) -> AppResult<SessionDescription>;
    async fn create_answer(&self) -> AppResult<SessionDescription>;
    async fn set_local_description(&self, description: SessionDescription) -> AppResult<()>;
    async fn set_remote_description(&self, description: SessionDescription) -> AppResult<()>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> AppResult<()>;
    /// Tears the connection down. Further calls fail.
    fn close(&self);
}

/// Creates peer connections that report their events on `events`.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        config: &PeerConfig,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> AppResult<Arc<dyn PeerConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_wire_names() {
        let candidate: IceCandidate = serde_json::from_value(json!({
            "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54400 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        }))
        .unwrap();
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_m_line_index, Some(0));
    }

    #[test]
    fn test_description_wire_names() {
        let offer = SessionDescription {
            kind: SdpType::Offer,
            sdp: "v=0".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&offer).unwrap(),
            json!({ "type": "offer", "sdp": "v=0" })
        );
    }

    #[test]
    fn test_default_config_has_no_turn() {
        let config = PeerConfig::from(&CallsConfig::default());
        assert_eq!(config.ice_servers.len(), 2);
        assert!(
            config
                .ice_servers
                .iter()
                .all(|s| s.urls.iter().all(|u| u.starts_with("stun:")))
        );
    }
}

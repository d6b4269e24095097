//! Call state published by a session.

use serde::{Deserialize, Serialize};

use orkut_core::types::CallType;

use super::media::MediaStream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Idle,
    /// Offer sent, waiting for the answer.
    Calling,
    /// Offer received, waiting for the local user.
    Ringing,
    Connected,
}

/// Snapshot of one call attempt.
#[derive(Debug, Clone, Default)]
pub struct CallState {
    pub status: CallStatus,
    pub local_stream: Option<MediaStream>,
    pub remote_stream: Option<MediaStream>,
    pub current_call_id: Option<String>,
    pub is_muted: bool,
    pub is_video_off: bool,
    pub is_call_active: bool,
    pub call_type: CallType,
}

impl CallState {
    /// The idle shape for a room of `call_type`.
    pub fn idle(call_type: CallType) -> Self {
        Self {
            call_type,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == CallStatus::Idle
    }

    /// Live local tracks; zero whenever the call is idle.
    pub fn live_local_tracks(&self) -> usize {
        self.local_stream
            .as_ref()
            .map(MediaStream::live_track_count)
            .unwrap_or(0)
    }
}

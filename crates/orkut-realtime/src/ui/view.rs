//! What the call screen shows for a given call state.

use serde::Serialize;

use orkut_core::types::CallType;

use crate::call::{CallState, CallStatus};

/// Full-screen video or avatar-centred audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallLayout {
    Video,
    Audio,
}

impl From<CallType> for CallLayout {
    fn from(call_type: CallType) -> Self {
        if call_type.has_video() {
            Self::Video
        } else {
            Self::Audio
        }
    }
}

/// Buttons on the control bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallControl {
    Accept,
    Reject,
    ToggleMute,
    ToggleVideo,
    HangUp,
}

/// Renderable summary of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallView {
    pub layout: CallLayout,
    pub status_label: String,
    pub controls: Vec<CallControl>,
    pub is_muted: bool,
    pub is_video_off: bool,
    pub has_remote_media: bool,
    /// Local preview in the corner; only for video.
    pub show_local_preview: bool,
}

/// `MM:SS`, minutes not wrapped at the hour.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn incoming_label(call_type: CallType) -> &'static str {
    match call_type {
        CallType::Video => "Chamada de vídeo recebida",
        CallType::Audio => "Chamada de áudio recebida",
    }
}

impl CallView {
    /// `None` while idle: the call screen is not shown at all.
    pub fn from_state(state: &CallState, elapsed_seconds: u64) -> Option<Self> {
        let layout = CallLayout::from(state.call_type);
        let (status_label, mut controls) = match state.status {
            CallStatus::Idle => return None,
            CallStatus::Ringing => (
                incoming_label(state.call_type).to_string(),
                vec![CallControl::Reject, CallControl::Accept],
            ),
            CallStatus::Calling => ("Chamando...".to_string(), vec![CallControl::ToggleMute]),
            CallStatus::Connected if !state.is_call_active => {
                ("Conectando...".to_string(), Vec::new())
            }
            CallStatus::Connected => {
                (format_duration(elapsed_seconds), vec![CallControl::ToggleMute])
            }
        };

        if controls.contains(&CallControl::ToggleMute) {
            if layout == CallLayout::Video {
                controls.push(CallControl::ToggleVideo);
            }
            controls.push(CallControl::HangUp);
        } else if controls.is_empty() {
            controls.push(CallControl::HangUp);
        }

        Some(Self {
            layout,
            status_label,
            controls,
            is_muted: state.is_muted,
            is_video_off: state.is_video_off,
            has_remote_media: state.is_call_active && state.remote_stream.is_some(),
            show_local_preview: layout == CallLayout::Video && state.local_stream.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: CallStatus, call_type: CallType, active: bool) -> CallState {
        CallState {
            status,
            is_call_active: active,
            ..CallState::idle(call_type)
        }
    }

    fn view(status: CallStatus, call_type: CallType, active: bool, elapsed: u64) -> CallView {
        CallView::from_state(&state(status, call_type, active), elapsed).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(65), "01:05");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn test_idle_has_no_view() {
        assert!(CallView::from_state(&CallState::default(), 0).is_none());
    }

    #[test]
    fn test_status_labels() {
        let ringing = view(CallStatus::Ringing, CallType::Video, false, 0);
        assert_eq!(ringing.status_label, "Chamada de vídeo recebida");
        assert_eq!(ringing.controls, vec![CallControl::Reject, CallControl::Accept]);

        let calling = view(CallStatus::Calling, CallType::Audio, false, 0);
        assert_eq!(calling.status_label, "Chamando...");
        assert_eq!(calling.layout, CallLayout::Audio);

        let connecting = view(CallStatus::Connected, CallType::Audio, false, 0);
        assert_eq!(connecting.status_label, "Conectando...");
        assert_eq!(connecting.controls, vec![CallControl::HangUp]);

        let active = view(CallStatus::Connected, CallType::Audio, true, 125);
        assert_eq!(active.status_label, "02:05");
    }

    #[test]
    fn test_video_toggle_only_for_video_calls() {
        let audio = view(CallStatus::Connected, CallType::Audio, true, 0);
        assert!(!audio.controls.contains(&CallControl::ToggleVideo));

        let video = view(CallStatus::Connected, CallType::Video, true, 0);
        assert_eq!(
            video.controls,
            vec![CallControl::ToggleMute, CallControl::ToggleVideo, CallControl::HangUp]
        );
    }
}

//! Local and remote media handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use orkut_core::result::AppResult;
use orkut_core::types::CallType;

/// Kind of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// Shared handle to one capture track. Clones refer to the same track.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// A new live, enabled track.
    pub fn new(kind: TrackKind) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: Uuid::new_v4().to_string(),
                kind,
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Mutes or unmutes the track without renegotiation.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Releases the capture device. Stopping is permanent.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether the track still holds its device.
    pub fn is_live(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }
}

/// A set of tracks captured or received together.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    /// Stops every track.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Number of tracks still holding a device.
    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }
}

/// Microphone processing switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// What to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: Option<AudioConstraints>,
    pub video: bool,
}

impl MediaConstraints {
    /// Processed microphone audio, plus camera video for video calls.
    pub fn for_call(call_type: CallType) -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: call_type.has_video(),
        }
    }
}

/// Capture device access.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquires a local stream. Denied or missing devices fail with
    /// [`orkut_core::error::ErrorKind::Media`].
    async fn get_user_media(&self, constraints: &MediaConstraints) -> AppResult<MediaStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let track = MediaTrack::new(TrackKind::Audio);
        let clone = track.clone();
        clone.set_enabled(false);
        assert!(!track.is_enabled());
        clone.stop();
        assert!(!track.is_live());
    }

    #[test]
    fn test_stop_all() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio),
            MediaTrack::new(TrackKind::Video),
        ]);
        assert_eq!(stream.live_track_count(), 2);
        stream.stop_all();
        assert_eq!(stream.live_track_count(), 0);
    }

    #[test]
    fn test_constraints_follow_call_type() {
        assert!(!MediaConstraints::for_call(CallType::Audio).video);
        assert!(MediaConstraints::for_call(CallType::Video).video);
        assert_eq!(
            MediaConstraints::for_call(CallType::Audio).audio,
            Some(AudioConstraints::default())
        );
    }
}

//! Auto-hiding of the control bar during video calls.

use std::time::{Duration, Instant};

use crate::call::CallState;

/// Idle time after which the control bar fades out.
pub const CONTROLS_IDLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Tracks pointer motion and decides whether the controls are shown.
///
/// Only active video calls ever hide them.
#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    hide_after: Duration,
    last_motion: Instant,
    auto_hide: bool,
}

impl ControlsVisibility {
    pub fn new(now: Instant) -> Self {
        Self {
            hide_after: CONTROLS_IDLE_TIMEOUT,
            last_motion: now,
            auto_hide: false,
        }
    }

    /// Re-evaluates after a state change. Entering an active video call
    /// shows the controls and starts the idle window.
    pub fn update(&mut self, state: &CallState, now: Instant) {
        let auto_hide = state.call_type.has_video() && state.is_call_active;
        if auto_hide && !self.auto_hide {
            self.last_motion = now;
        }
        self.auto_hide = auto_hide;
    }

    pub fn pointer_moved(&mut self, now: Instant) {
        self.last_motion = now;
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        !self.auto_hide || now.saturating_duration_since(self.last_motion) < self.hide_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallStatus;
    use orkut_core::types::CallType;

    fn active(call_type: CallType) -> CallState {
        CallState {
            status: CallStatus::Connected,
            is_call_active: true,
            ..CallState::idle(call_type)
        }
    }

    #[test]
    fn test_hides_after_idle_and_reappears_on_motion() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(start);
        controls.update(&active(CallType::Video), start);

        assert!(controls.is_visible(start + Duration::from_millis(2999)));
        assert!(!controls.is_visible(start + Duration::from_secs(3)));

        let moved = start + Duration::from_secs(5);
        controls.pointer_moved(moved);
        assert!(controls.is_visible(moved + Duration::from_secs(1)));
        assert!(!controls.is_visible(moved + Duration::from_secs(4)));
    }

    #[test]
    fn test_audio_calls_never_hide() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(start);
        controls.update(&active(CallType::Audio), start);
        assert!(controls.is_visible(start + Duration::from_secs(60)));
    }
}

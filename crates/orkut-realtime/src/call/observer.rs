//! Callbacks for the owner of a call session.

use orkut_core::error::AppError;
use orkut_core::types::UserId;

use super::state::CallState;

/// Receives session notifications. All methods default to no-ops.
pub trait CallObserver: Send + Sync {
    /// Called after every state change.
    fn on_state_change(&self, _state: &CallState) {}

    /// Called when media, signaling, or the peer connection fails.
    fn on_error(&self, _error: &AppError) {}

    /// Called when an offer from `from` starts ringing.
    fn on_incoming_call(&self, _call_id: &str, _from: UserId) {}
}

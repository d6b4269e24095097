//! Presentation models for the call screen and the incoming-call prompt.
//!
//! Nothing here renders; the types turn [`CallState`](crate::call::CallState)
//! into what a front end should show and drive the timers around it.

pub mod alert;
pub mod clock;
pub mod controls;
pub mod prompt;
pub mod view;

pub use alert::{RING_PATTERN, RingBurst, RingtonePlayer, Vibrator};
pub use clock::CallClock;
pub use controls::ControlsVisibility;
pub use prompt::{IncomingCallPrompt, PromptAlerts, PromptCommand, PromptOutcome, run_prompt};
pub use view::{CallControl, CallLayout, CallView, format_duration};

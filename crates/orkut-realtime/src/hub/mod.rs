//! Broadcast and presence channels.
//!
//! [`BroadcastChannel`] is the handle every client-side engine talks to;
//! [`ChannelProvider`] opens one. [`MemoryHub`] implements both in process
//! and backs the WebSocket connections.

pub mod channel;
pub mod event;
pub mod memory;
pub mod topic;

pub use channel::{BroadcastChannel, ChannelProvider};
pub use event::{HubEvent, PresenceState};
pub use memory::{HubChannel, MemoryHub};

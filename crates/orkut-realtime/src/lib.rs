//! # orkut-realtime
//!
//! Realtime layer for Orkut calls:
//!
//! - An in-process broadcast/presence hub and the WebSocket connections on it
//! - The presence tracker every client runs against the presence topic
//! - The call-signaling session (offer/answer/ICE over a per-room channel)
//! - Presentation models for the call screen and incoming-call prompt

pub mod call;
pub mod connection;
pub mod hub;
pub mod message;
pub mod presence;
pub mod server;
pub mod ui;

pub use call::{CallSession, CallState, CallStatus};
pub use connection::manager::ConnectionManager;
pub use hub::{BroadcastChannel, ChannelProvider, MemoryHub};
pub use presence::tracker::PresenceTracker;
pub use server::RealtimeEngine;

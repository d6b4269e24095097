//! Channel traits consumed by the presence tracker and call sessions.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use orkut_core::result::AppResult;

use super::event::{HubEvent, PresenceState};

/// One subscription to a topic.
///
/// Dropping the last reference leaves the topic.
#[async_trait]
pub trait BroadcastChannel: Send + Sync + std::fmt::Debug {
    /// Topic name.
    fn topic(&self) -> &str;

    /// Broadcast `event` to every other member of the topic.
    async fn send(&self, event: &str, payload: serde_json::Value) -> AppResult<()>;

    /// Publish (or replace) this member's presence meta.
    async fn track(&self, meta: serde_json::Value) -> AppResult<()>;

    /// Withdraw this member's presence meta.
    async fn untrack(&self) -> AppResult<()>;

    /// Snapshot of the topic's presence state.
    fn presence_state(&self) -> PresenceState;

    /// Take the event stream. Returns `None` once taken.
    fn take_events(&self) -> Option<mpsc::Receiver<HubEvent>>;

    /// Leave the topic. Further sends fail.
    async fn unsubscribe(&self) -> AppResult<()>;
}

/// Opens channels by topic.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Subscribe to `topic`, optionally with a presence key.
    async fn channel(
        &self,
        topic: &str,
        presence_key: Option<String>,
    ) -> AppResult<Arc<dyn BroadcastChannel>>;
}

//! Individual WebSocket connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use orkut_core::types::UserId;

use crate::hub::HubChannel;
use crate::message::types::OutboundMessage;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A joined topic: the hub membership plus the task forwarding its events.
#[derive(Debug)]
pub struct Subscription {
    /// Hub membership; the topic is left once the last reference drops.
    pub channel: Arc<HubChannel>,
    /// Forwarder from hub events to the socket.
    pub forwarder: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing messages to the client
/// plus the topics the connection has joined.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Sender for outbound messages
    pub sender: mpsc::Sender<OutboundMessage>,
    /// Topic name → subscription
    pub subscriptions: DashMap<String, Subscription>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_activity: RwLock<DateTime<Utc>>,
    /// Last client heartbeat
    pub last_heartbeat: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    pub alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(user_id: UserId, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            sender,
            subscriptions: DashMap::new(),
            connected_at: now,
            last_activity: RwLock::new(now),
            last_heartbeat: RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Send an outbound message to this connection
    pub async fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Connection send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Update last activity timestamp
    pub async fn touch(&self) {
        let mut la = self.last_activity.write().await;
        *la = Utc::now();
    }

    /// Record a client heartbeat
    pub async fn record_heartbeat(&self) {
        let mut lh = self.last_heartbeat.write().await;
        *lh = Utc::now();
    }

    /// Get current subscription count
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Check if subscribed to a topic
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains_key(topic)
    }

    /// Membership for a joined topic.
    pub fn channel(&self, topic: &str) -> Option<Arc<HubChannel>> {
        self.subscriptions.get(topic).map(|s| s.channel.clone())
    }

    /// Leave every joined topic.
    pub fn clear_subscriptions(&self) {
        self.subscriptions.clear();
    }
}

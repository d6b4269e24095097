//! Connection manager. Handles connection lifecycle and routes client
//! messages into the hub.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use orkut_core::config::RealtimeConfig;
use orkut_core::types::UserId;

use crate::hub::{BroadcastChannel, MemoryHub};
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{validate_inbound, validate_topic};

use super::handle::{ConnectionHandle, ConnectionId, Subscription};
use super::pool::ConnectionPool;

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Topic hub shared with in-process clients.
    hub: MemoryHub,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(config: RealtimeConfig, hub: MemoryHub) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            hub,
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Returns the connection handle and a receiver for outbound messages.
    pub fn register(
        &self,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));

        let existing = self.pool.get_user_connections(&user_id);
        if existing.len() >= self.config.max_connections_per_user {
            warn!(
                user_id = %user_id,
                count = existing.len(),
                max = self.config.max_connections_per_user,
                "User at max connections, oldest will be replaced"
            );
            if let Some(oldest) = existing.first() {
                self.unregister(&oldest.id);
            }
        }

        self.pool.add(handle.clone());

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection and leaves every topic it joined.
    pub fn unregister(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.remove(conn_id) {
            handle.mark_dead();
            handle.clear_subscriptions();

            info!(
                conn_id = %conn_id,
                user_id = %handle.user_id,
                "WebSocket connection unregistered"
            );
        }
    }

    /// Processes an inbound message from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw_message: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };

        handle.touch().await;

        if let Err(e) = validate_inbound(raw_message) {
            handle
                .send(OutboundMessage::error("INVALID_MESSAGE", e.message))
                .await;
            return;
        }

        let msg: InboundMessage = match serde_json::from_str(raw_message) {
            Ok(m) => m,
            Err(e) => {
                handle
                    .send(OutboundMessage::error(
                        "INVALID_MESSAGE",
                        format!("Failed to parse message: {e}"),
                    ))
                    .await;
                return;
            }
        };

        match msg {
            InboundMessage::Join {
                topic,
                presence_key,
            } => {
                self.handle_join(&handle, topic, presence_key).await;
            }
            InboundMessage::Leave { topic } => {
                handle.subscriptions.remove(&topic);
                handle.send(OutboundMessage::Left { topic }).await;
            }
            InboundMessage::Broadcast {
                topic,
                event,
                payload,
            } => {
                let result = match handle.channel(&topic) {
                    Some(channel) => channel.send(&event, payload).await,
                    None => {
                        self.not_joined(&handle, &topic).await;
                        return;
                    }
                };
                if let Err(e) = result {
                    handle.send(OutboundMessage::error("SIGNALING", e.message)).await;
                }
            }
            InboundMessage::Track { topic, payload } => {
                let result = match handle.channel(&topic) {
                    Some(channel) => channel.track(payload).await,
                    None => {
                        self.not_joined(&handle, &topic).await;
                        return;
                    }
                };
                if let Err(e) = result {
                    handle.send(OutboundMessage::error("SIGNALING", e.message)).await;
                }
            }
            InboundMessage::Untrack { topic } => {
                if let Some(channel) = handle.channel(&topic) {
                    let _ = channel.untrack().await;
                }
            }
            InboundMessage::Heartbeat => {
                handle.record_heartbeat().await;
            }
        }
    }

    /// Handles a join request with limit and presence-key checks.
    async fn handle_join(
        &self,
        handle: &Arc<ConnectionHandle>,
        topic: String,
        presence_key: Option<String>,
    ) {
        if let Err(e) = validate_topic(&topic) {
            handle
                .send(OutboundMessage::error("INVALID_TOPIC", e.message))
                .await;
            return;
        }

        let own_key = handle.user_id.to_string();
        if presence_key.as_deref().is_some_and(|key| key != own_key) {
            handle
                .send(OutboundMessage::error(
                    "FORBIDDEN",
                    "Presence key must be the caller's user id",
                ))
                .await;
            return;
        }

        if handle.is_subscribed(&topic) {
            handle.send(OutboundMessage::Joined { topic }).await;
            return;
        }

        if handle.subscription_count() >= self.config.max_subscriptions_per_connection {
            handle
                .send(OutboundMessage::error(
                    "MAX_SUBSCRIPTIONS",
                    format!(
                        "Maximum subscriptions ({}) reached",
                        self.config.max_subscriptions_per_connection
                    ),
                ))
                .await;
            return;
        }

        let channel = Arc::new(self.hub.join(&topic, Some(own_key)));
        let events = channel.take_events();

        handle
            .send(OutboundMessage::Joined {
                topic: topic.clone(),
            })
            .await;

        let forwarder = tokio::spawn(forward_events(
            Arc::downgrade(handle),
            topic.clone(),
            events,
        ));
        handle
            .subscriptions
            .insert(topic.clone(), Subscription { channel, forwarder });

        debug!(conn_id = %handle.id, topic = %topic, "Joined topic");
    }

    async fn not_joined(&self, handle: &ConnectionHandle, topic: &str) {
        handle
            .send(OutboundMessage::error(
                "NOT_JOINED",
                format!("Join {topic} before using it"),
            ))
            .await;
    }

    /// Closes all connections.
    pub async fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Checks if a user is currently connected.
    pub fn is_user_connected(&self, user_id: &UserId) -> bool {
        !self.pool.get_user_connections(user_id).is_empty()
    }

    /// Returns the realtime configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }
}

/// Pushes hub events for `topic` to the connection until either side goes away.
async fn forward_events(
    handle: Weak<ConnectionHandle>,
    topic: String,
    events: Option<mpsc::Receiver<crate::hub::HubEvent>>,
) {
    let Some(mut events) = events else {
        return;
    };
    while let Some(event) = events.recv().await {
        let Some(handle) = handle.upgrade() else {
            break;
        };
        let delivered = handle
            .send(OutboundMessage::from_hub_event(&topic, event))
            .await;
        if !delivered && !handle.is_alive() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(RealtimeConfig::default(), MemoryHub::new(32))
    }

    async fn drain_until<F>(rx: &mut mpsc::Receiver<OutboundMessage>, pred: F) -> OutboundMessage
    where
        F: Fn(&OutboundMessage) -> bool,
    {
        loop {
            let msg = rx.recv().await.expect("connection closed");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_broadcast_between_connections() {
        let mgr = manager();
        let (a, mut a_rx) = mgr.register(UserId::new());
        let (b, mut b_rx) = mgr.register(UserId::new());

        for (conn, rx) in [(&a, &mut a_rx), (&b, &mut b_rx)] {
            mgr.handle_inbound(&conn.id, r#"{"type":"join","topic":"audio-call-r1"}"#)
                .await;
            let joined = drain_until(rx, |m| matches!(m, OutboundMessage::Joined { .. })).await;
            assert_eq!(
                joined,
                OutboundMessage::Joined {
                    topic: "audio-call-r1".to_string()
                }
            );
        }

        mgr.handle_inbound(
            &a.id,
            r#"{"type":"broadcast","topic":"audio-call-r1","event":"call-end","payload":{"callId":"r1"}}"#,
        )
        .await;

        let msg = drain_until(&mut b_rx, |m| matches!(m, OutboundMessage::Broadcast { .. })).await;
        assert_eq!(
            msg,
            OutboundMessage::Broadcast {
                topic: "audio-call-r1".to_string(),
                event: "call-end".to_string(),
                payload: json!({ "callId": "r1" }),
            }
        );
    }

    #[tokio::test]
    async fn test_foreign_presence_key_rejected() {
        let mgr = manager();
        let (a, mut rx) = mgr.register(UserId::new());
        let raw = format!(
            r#"{{"type":"join","topic":"user_presence","presence_key":"{}"}}"#,
            UserId::new()
        );
        mgr.handle_inbound(&a.id, &raw).await;
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, OutboundMessage::Error { code, .. } if code == "FORBIDDEN"));
    }

    #[tokio::test]
    async fn test_broadcast_without_join_is_an_error() {
        let mgr = manager();
        let (a, mut rx) = mgr.register(UserId::new());
        mgr.handle_inbound(
            &a.id,
            r#"{"type":"broadcast","topic":"room","event":"x","payload":{}}"#,
        )
        .await;
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, OutboundMessage::Error { code, .. } if code == "NOT_JOINED"));
    }

    #[tokio::test]
    async fn test_invalid_json_reports_error() {
        let mgr = manager();
        let (a, mut rx) = mgr.register(UserId::new());
        mgr.handle_inbound(&a.id, "{not json").await;
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, OutboundMessage::Error { code, .. } if code == "INVALID_MESSAGE"));
    }

    #[tokio::test]
    async fn test_unregister_leaves_topics() {
        let hub = MemoryHub::new(32);
        let mgr = ConnectionManager::new(RealtimeConfig::default(), hub.clone());
        let (a, _rx) = mgr.register(UserId::new());
        mgr.handle_inbound(&a.id, r#"{"type":"join","topic":"user_presence"}"#)
            .await;
        assert_eq!(hub.member_count("user_presence"), 1);

        mgr.unregister(&a.id);
        assert_eq!(hub.member_count("user_presence"), 0);
        assert_eq!(mgr.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_oldest_connection_replaced_at_limit() {
        let config = RealtimeConfig {
            max_connections_per_user: 1,
            ..RealtimeConfig::default()
        };
        let mgr = ConnectionManager::new(config, MemoryHub::new(8));
        let user = UserId::new();
        let (first, _rx1) = mgr.register(user);
        let (_second, _rx2) = mgr.register(user);
        assert!(!first.is_alive());
        assert_eq!(mgr.connection_count(), 1);
    }
}

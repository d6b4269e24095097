//! In-process hub of broadcast/presence topics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use orkut_core::error::AppError;
use orkut_core::result::AppResult;

use super::channel::{BroadcastChannel, ChannelProvider};
use super::event::{HubEvent, PresenceState};
use super::topic::{Member, MemberId, Topic};

#[derive(Debug)]
struct HubState {
    topics: DashMap<String, Topic>,
    buffer_size: usize,
}

/// Registry of all active topics.
#[derive(Debug, Clone)]
pub struct MemoryHub {
    state: Arc<HubState>,
}

impl MemoryHub {
    /// Creates a hub whose member queues hold `buffer_size` events.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            state: Arc::new(HubState {
                topics: DashMap::new(),
                buffer_size: buffer_size.max(1),
            }),
        }
    }

    /// Joins `topic` and returns the member handle.
    ///
    /// The new member immediately receives a presence sync.
    pub fn join(&self, topic: &str, presence_key: Option<String>) -> HubChannel {
        let (tx, rx) = mpsc::channel(self.state.buffer_size);
        let id = Uuid::new_v4();

        let mut entry = self
            .state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic.to_string()));
        let member = Member {
            id,
            presence_key,
            meta: None,
            sender: tx,
        };
        member.deliver(HubEvent::Sync {
            state: entry.presence_state(),
        });
        entry.add(member);
        drop(entry);

        debug!(topic = %topic, member_id = %id, "Joined topic");

        HubChannel {
            state: self.state.clone(),
            topic: topic.to_string(),
            member_id: id,
            events: Mutex::new(Some(rx)),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns total number of active topics.
    pub fn topic_count(&self) -> usize {
        self.state.topics.len()
    }

    /// Returns member count for a topic.
    pub fn member_count(&self, topic: &str) -> usize {
        self.state
            .topics
            .get(topic)
            .map(|t| t.member_count())
            .unwrap_or(0)
    }

    /// Presence state of a topic.
    pub fn presence_state(&self, topic: &str) -> PresenceState {
        self.state
            .topics
            .get(topic)
            .map(|t| t.presence_state())
            .unwrap_or_default()
    }
}

impl HubState {
    fn publish(
        &self,
        topic: &str,
        from: MemberId,
        event: &str,
        payload: serde_json::Value,
    ) -> usize {
        let Some(entry) = self.topics.get(topic) else {
            return 0;
        };
        entry.deliver_except(
            Some(from),
            &HubEvent::Broadcast {
                event: event.to_string(),
                payload,
            },
        )
    }

    fn track(&self, topic: &str, id: MemberId, meta: serde_json::Value) -> AppResult<()> {
        let mut entry = self
            .topics
            .get_mut(topic)
            .ok_or_else(|| AppError::signaling(format!("Not subscribed to {topic}")))?;
        let member = entry
            .member_mut(id)
            .ok_or_else(|| AppError::signaling(format!("Not subscribed to {topic}")))?;
        let key = member
            .presence_key
            .clone()
            .ok_or_else(|| AppError::signaling("Channel was joined without a presence key"))?;
        member.meta = Some(meta.clone());
        entry.deliver_presence(HubEvent::Join {
            key,
            new_presences: vec![meta],
        });
        Ok(())
    }

    fn untrack(&self, topic: &str, id: MemberId) {
        let Some(mut entry) = self.topics.get_mut(topic) else {
            return;
        };
        let Some(member) = entry.member_mut(id) else {
            return;
        };
        if let (Some(key), Some(meta)) = (member.presence_key.clone(), member.meta.take()) {
            entry.deliver_presence(HubEvent::Leave {
                key,
                left_presences: vec![meta],
            });
        }
    }

    fn leave(&self, topic: &str, id: MemberId) {
        let Some(mut entry) = self.topics.get_mut(topic) else {
            return;
        };
        if let Some(member) = entry.remove(id) {
            if let (Some(key), Some(meta)) = (member.presence_key, member.meta) {
                entry.deliver_presence(HubEvent::Leave {
                    key,
                    left_presences: vec![meta],
                });
            }
            debug!(topic = %topic, member_id = %id, "Left topic");
        }
        if entry.is_empty() {
            drop(entry);
            self.topics.remove_if(topic, |_, t| t.is_empty());
        }
    }
}

#[async_trait]
impl ChannelProvider for MemoryHub {
    async fn channel(
        &self,
        topic: &str,
        presence_key: Option<String>,
    ) -> AppResult<Arc<dyn BroadcastChannel>> {
        Ok(Arc::new(self.join(topic, presence_key)))
    }
}

/// A member's handle on one topic. Leaves the topic when dropped.
#[derive(Debug)]
pub struct HubChannel {
    state: Arc<HubState>,
    topic: String,
    member_id: MemberId,
    events: Mutex<Option<mpsc::Receiver<HubEvent>>>,
    closed: AtomicBool,
}

impl HubChannel {
    /// Member ID of this handle.
    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::signaling(format!(
                "Channel {} is unsubscribed",
                self.topic
            )));
        }
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.leave(&self.topic, self.member_id);
        }
    }
}

#[async_trait]
impl BroadcastChannel for HubChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, event: &str, payload: serde_json::Value) -> AppResult<()> {
        self.ensure_open()?;
        let delivered = self.state.publish(&self.topic, self.member_id, event, payload);
        debug!(topic = %self.topic, event = %event, delivered, "Broadcast sent");
        Ok(())
    }

    async fn track(&self, meta: serde_json::Value) -> AppResult<()> {
        self.ensure_open()?;
        self.state.track(&self.topic, self.member_id, meta)
    }

    async fn untrack(&self) -> AppResult<()> {
        self.ensure_open()?;
        self.state.untrack(&self.topic, self.member_id);
        Ok(())
    }

    fn presence_state(&self) -> PresenceState {
        self.state
            .topics
            .get(&self.topic)
            .map(|t| t.presence_state())
            .unwrap_or_default()
    }

    fn take_events(&self) -> Option<mpsc::Receiver<HubEvent>> {
        self.events.lock().ok().and_then(|mut slot| slot.take())
    }

    async fn unsubscribe(&self) -> AppResult<()> {
        self.close();
        Ok(())
    }
}

impl Drop for HubChannel {
    fn drop(&mut self) {
        self.close();
    }
}

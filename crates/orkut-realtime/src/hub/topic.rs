//! Single topic with its members and their presence metas.

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use super::event::{HubEvent, PresenceState};

/// Unique member identifier.
pub type MemberId = Uuid;

/// One subscriber of a topic.
#[derive(Debug)]
pub struct Member {
    /// Member ID.
    pub id: MemberId,
    /// Presence key, if the member joined with one.
    pub presence_key: Option<String>,
    /// Tracked presence meta.
    pub meta: Option<serde_json::Value>,
    /// Event queue of the member.
    pub sender: mpsc::Sender<HubEvent>,
}

impl Member {
    /// Queue an event without waiting. Returns `false` when the queue is
    /// full or the receiver is gone.
    pub fn deliver(&self, event: HubEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(member_id = %self.id, "Member event queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// A topic with members kept in join order.
#[derive(Debug)]
pub struct Topic {
    /// Topic name.
    pub name: String,
    members: Vec<Member>,
}

impl Topic {
    /// Creates an empty topic.
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    /// Adds a member.
    pub fn add(&mut self, member: Member) {
        self.members.push(member);
    }

    /// Removes a member and returns it.
    pub fn remove(&mut self, id: MemberId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(index))
    }

    /// Mutable access to one member.
    pub fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    /// Whether the topic has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Presence state built from every tracked member.
    pub fn presence_state(&self) -> PresenceState {
        let mut state = PresenceState::new();
        for member in &self.members {
            if let (Some(key), Some(meta)) = (&member.presence_key, &member.meta) {
                state.entry(key.clone()).or_default().push(meta.clone());
            }
        }
        state
    }

    /// Deliver to every member except `skip`.
    pub fn deliver_except(&self, skip: Option<MemberId>, event: &HubEvent) -> usize {
        self.members
            .iter()
            .filter(|m| Some(m.id) != skip)
            .filter(|m| m.deliver(event.clone()))
            .count()
    }

    /// Deliver a presence change to every member. Full state only goes out
    /// on join.
    pub fn deliver_presence(&self, change: HubEvent) -> usize {
        self.deliver_except(None, &change)
    }
}

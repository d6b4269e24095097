//! Presence tracker: publishes the local user's presence on the shared
//! presence topic and keeps a merged view of everyone else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use orkut_core::config::PresenceConfig;
use orkut_core::result::AppResult;
use orkut_core::types::UserId;

use crate::hub::{BroadcastChannel, ChannelProvider, HubEvent};

use super::activity::{ActivityClock, ActivityKind, Visibility};
use super::record::{Activity, PresenceRecord, PresenceUpdate, ProfileLookup, ProfileSummary};

/// Broadcast event carrying activity changes between heartbeats.
pub const PRESENCE_UPDATE_EVENT: &str = "presence_update";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct LocalPresence {
    clock: ActivityClock,
    profile: ProfileSummary,
    available: bool,
    in_call: bool,
}

impl LocalPresence {
    fn activity(&self) -> Activity {
        if self.in_call {
            Activity::InCall
        } else if !self.available {
            Activity::Busy
        } else {
            self.clock.current()
        }
    }

    fn is_available(&self) -> bool {
        self.available && !self.in_call
    }
}

struct TrackerInner {
    user_id: UserId,
    config: PresenceConfig,
    provider: Arc<dyn ChannelProvider>,
    profiles: Option<Arc<dyn ProfileLookup>>,
    channel: RwLock<Option<Arc<dyn BroadcastChannel>>>,
    peers: DashMap<UserId, PresenceRecord>,
    local: Mutex<LocalPresence>,
    online: AtomicBool,
}

impl TrackerInner {
    fn channel(&self) -> Option<Arc<dyn BroadcastChannel>> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self) -> PresenceRecord {
        let local = lock(&self.local);
        PresenceRecord {
            user_id: self.user_id,
            username: local.profile.username.clone(),
            display_name: local.profile.display_name.clone(),
            photo_url: local.profile.photo_url.clone(),
            is_online: true,
            last_seen: Utc::now(),
            is_available_for_calls: local.is_available(),
            current_activity: Some(local.activity()),
        }
    }

    /// Tracks the current record on the presence topic.
    async fn publish(&self) -> AppResult<()> {
        let Some(channel) = self.channel() else {
            return Ok(());
        };
        let meta = serde_json::to_value(self.record())?;
        channel.track(meta).await
    }

    async fn publish_or_warn(&self) {
        if let Err(e) = self.publish().await {
            warn!(user_id = %self.user_id, error = %e, "Failed to publish presence");
        }
    }

    fn apply(&self, event: HubEvent) {
        match event {
            HubEvent::Sync { state } => {
                self.peers.clear();
                for (key, metas) in state {
                    if let Some(record) = decode_presence(&key, metas.first()) {
                        self.peers.insert(record.user_id, record);
                    }
                }
                debug!(user_id = %self.user_id, peers = self.peers.len(), "Presence synced");
            }
            HubEvent::Join { key, new_presences } => {
                if let Some(record) = decode_presence(&key, new_presences.first()) {
                    debug!(peer = %record.user_id, "Peer online");
                    self.peers.insert(record.user_id, record);
                }
            }
            HubEvent::Leave { key, .. } => {
                let Ok(id) = key.parse::<UserId>() else {
                    return;
                };
                if let Some(mut record) = self.peers.get_mut(&id) {
                    record.is_online = false;
                    record.last_seen = Utc::now();
                    record.current_activity = None;
                    debug!(peer = %id, "Peer offline");
                }
            }
            HubEvent::Broadcast { event, payload } if event == PRESENCE_UPDATE_EVENT => {
                match serde_json::from_value::<PresenceUpdate>(payload) {
                    Ok(update) => {
                        if let Some(mut record) = self.peers.get_mut(&update.user_id) {
                            record.last_seen = update.last_seen;
                            record.is_available_for_calls = update.is_available_for_calls;
                            record.current_activity = Some(update.current_activity);
                        }
                    }
                    Err(e) => debug!(error = %e, "Ignoring malformed presence update"),
                }
            }
            HubEvent::Broadcast { .. } => {}
        }
    }
}

/// Decodes the first meta under a presence key into a record marked online.
fn decode_presence(key: &str, meta: Option<&serde_json::Value>) -> Option<PresenceRecord> {
    let id = match key.parse::<UserId>() {
        Ok(id) => id,
        Err(_) => {
            debug!(key = %key, "Ignoring presence with non-user key");
            return None;
        }
    };
    let mut record: PresenceRecord = match serde_json::from_value(meta?.clone()) {
        Ok(record) => record,
        Err(e) => {
            debug!(key = %key, error = %e, "Ignoring malformed presence meta");
            return None;
        }
    };
    record.user_id = id;
    record.is_online = true;
    record.current_activity.get_or_insert(Activity::Active);
    Some(record)
}

/// Tracks the local user's presence and the merged presence of others.
///
/// `connect` opens the presence topic through the injected
/// [`ChannelProvider`]; `disconnect` (or dropping the tracker) releases it.
pub struct PresenceTracker {
    inner: Arc<TrackerInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("user_id", &self.inner.user_id)
            .field("online", &self.is_online())
            .finish()
    }
}

impl PresenceTracker {
    /// Creates a disconnected tracker for `user_id`.
    pub fn new(
        user_id: UserId,
        config: PresenceConfig,
        provider: Arc<dyn ChannelProvider>,
    ) -> Self {
        Self::build(user_id, config, provider, None)
    }

    /// Like [`PresenceTracker::new`], filling the profile fields of the
    /// tracked record from `profiles`.
    pub fn with_profiles(
        user_id: UserId,
        config: PresenceConfig,
        provider: Arc<dyn ChannelProvider>,
        profiles: Arc<dyn ProfileLookup>,
    ) -> Self {
        Self::build(user_id, config, provider, Some(profiles))
    }

    fn build(
        user_id: UserId,
        config: PresenceConfig,
        provider: Arc<dyn ChannelProvider>,
        profiles: Option<Arc<dyn ProfileLookup>>,
    ) -> Self {
        let clock = ActivityClock::new(&config);
        Self {
            inner: Arc::new(TrackerInner {
                user_id,
                config,
                provider,
                profiles,
                channel: RwLock::new(None),
                peers: DashMap::new(),
                local: Mutex::new(LocalPresence {
                    clock,
                    profile: ProfileSummary::default(),
                    available: true,
                    in_call: false,
                }),
                online: AtomicBool::new(false),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Joins the presence topic, publishes the local record, and starts the
    /// heartbeat. Subscribe and track failures are logged and swallowed.
    pub async fn connect(&self) {
        let inner = &self.inner;
        if inner.channel().is_some() {
            return;
        }

        info!(user_id = %inner.user_id, topic = %inner.config.topic, "Connecting to presence");

        let channel = match inner
            .provider
            .channel(&inner.config.topic, Some(inner.user_id.to_string()))
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                warn!(user_id = %inner.user_id, error = %e, "Failed to join presence topic");
                return;
            }
        };

        let events = channel.take_events();
        *inner.channel.write().unwrap_or_else(PoisonError::into_inner) = Some(channel);

        if let Some(events) = events {
            self.spawn(listen(Arc::downgrade(inner), events));
        }

        if let Some(profiles) = &inner.profiles {
            match profiles.lookup(inner.user_id).await {
                Ok(Some(profile)) => lock(&inner.local).profile = profile,
                Ok(None) => {}
                Err(e) => warn!(user_id = %inner.user_id, error = %e, "Profile lookup failed"),
            }
        }

        match inner.publish().await {
            Ok(()) => inner.online.store(true, Ordering::SeqCst),
            Err(e) => warn!(user_id = %inner.user_id, error = %e, "Failed to track presence"),
        }

        let period = Duration::from_secs(inner.config.heartbeat_seconds.max(1));
        self.spawn(heartbeat(Arc::downgrade(inner), period));
    }

    /// Leaves the presence topic and forgets every peer. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        self.abort_tasks();

        let channel = self
            .inner
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(channel) = channel {
            info!(user_id = %self.inner.user_id, "Disconnecting from presence");
            if let Err(e) = channel.untrack().await {
                debug!(error = %e, "Untrack failed during disconnect");
            }
            if let Err(e) = channel.unsubscribe().await {
                debug!(error = %e, "Unsubscribe failed during disconnect");
            }
        }

        self.inner.peers.clear();
        self.inner.online.store(false, Ordering::SeqCst);
    }

    /// Records local input and broadcasts the fresh activity immediately.
    pub async fn record_activity(&self, kind: ActivityKind) {
        lock(&self.inner.local).clock.record();

        if !self.is_online() {
            return;
        }
        let Some(channel) = self.inner.channel() else {
            return;
        };
        let record = self.inner.record();
        let update = PresenceUpdate {
            user_id: record.user_id,
            last_seen: record.last_seen,
            is_available_for_calls: record.is_available_for_calls,
            current_activity: record.current_activity.unwrap_or(Activity::Active),
        };
        let payload = match serde_json::to_value(&update) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode presence update");
                return;
            }
        };
        if let Err(e) = channel.send(PRESENCE_UPDATE_EVENT, payload).await {
            warn!(user_id = %self.inner.user_id, ?kind, error = %e, "Failed to broadcast activity");
        }
    }

    /// Hidden pages stop taking calls; visible pages take them again.
    pub async fn set_visibility(&self, visibility: Visibility) {
        match visibility {
            Visibility::Hidden => self.set_available_for_calls(false).await,
            Visibility::Visible => {
                self.set_available_for_calls(true).await;
                self.record_activity(ActivityKind::Pointer).await;
            }
        }
    }

    /// Overrides call availability and publishes it.
    pub async fn set_available_for_calls(&self, available: bool) {
        lock(&self.inner.local).available = available;
        self.inner.publish_or_warn().await;
    }

    /// Marks the local user as on (or off) a call and publishes it.
    pub async fn set_in_call(&self, in_call: bool) {
        lock(&self.inner.local).in_call = in_call;
        self.inner.publish_or_warn().await;
    }

    /// Whether the local record has been tracked.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Activity currently published for the local user.
    pub fn current_activity(&self) -> Activity {
        lock(&self.inner.local).activity()
    }

    /// Every user currently online, including the local user.
    pub fn online_users(&self) -> Vec<PresenceRecord> {
        self.inner
            .peers
            .iter()
            .filter(|r| r.is_online)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Online users other than the local one who can take a call.
    pub fn available_users(&self) -> Vec<PresenceRecord> {
        self.inner
            .peers
            .iter()
            .filter(|r| r.is_callable() && r.user_id != self.inner.user_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Whether `user_id` is online.
    pub fn is_user_online(&self, user_id: UserId) -> bool {
        self.inner
            .peers
            .get(&user_id)
            .is_some_and(|r| r.is_online)
    }

    /// Whether `user_id` is someone else who is online, available, and not
    /// already on a call.
    pub fn is_user_available_for_calls(&self, user_id: UserId) -> bool {
        user_id != self.inner.user_id
            && self
                .inner
                .peers
                .get(&user_id)
                .is_some_and(|r| r.is_callable())
    }

    /// Presence record of one user, if known.
    pub fn presence_of(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.inner.peers.get(&user_id).map(|r| r.value().clone())
    }

    fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        lock(&self.tasks).push(tokio::spawn(future));
    }

    fn abort_tasks(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn listen(inner: Weak<TrackerInner>, mut events: mpsc::Receiver<HubEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.apply(event);
    }
}

async fn heartbeat(inner: Weak<TrackerInner>, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.publish_or_warn().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orkut_core::error::AppError;

    use crate::hub::MemoryHub;

    async fn settle() {
        time::sleep(Duration::from_millis(20)).await;
    }

    fn tracker(hub: &MemoryHub, user: UserId) -> PresenceTracker {
        PresenceTracker::new(user, PresenceConfig::default(), Arc::new(hub.clone()))
    }

    struct FailingProvider;

    #[async_trait]
    impl ChannelProvider for FailingProvider {
        async fn channel(
            &self,
            _topic: &str,
            _presence_key: Option<String>,
        ) -> AppResult<Arc<dyn BroadcastChannel>> {
            Err(AppError::signaling("subscribe rejected"))
        }
    }

    struct FixedProfile;

    #[async_trait]
    impl ProfileLookup for FixedProfile {
        async fn lookup(&self, _user_id: UserId) -> AppResult<Option<ProfileSummary>> {
            Ok(Some(ProfileSummary {
                username: Some("ana".to_string()),
                display_name: Some("Ana Souza".to_string()),
                photo_url: None,
            }))
        }
    }

    #[tokio::test]
    async fn test_peers_see_each_other() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;
        settle().await;

        assert!(a.is_online());
        assert!(a.is_user_online(b_id));
        assert!(b.is_user_online(a_id));
        assert_eq!(b.online_users().len(), 2);

        let available: Vec<UserId> = b.available_users().iter().map(|r| r.user_id).collect();
        assert_eq!(available, vec![a_id]);
    }

    #[tokio::test]
    async fn test_self_is_never_available_for_calls() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;
        settle().await;

        assert!(a.is_user_online(a_id));
        assert!(a.presence_of(a_id).unwrap().is_callable());
        assert!(!a.is_user_available_for_calls(a_id));
        assert!(a.is_user_available_for_calls(b_id));
    }

    #[tokio::test]
    async fn test_in_call_is_not_available() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;

        a.set_in_call(true).await;
        settle().await;
        assert_eq!(a.current_activity(), Activity::InCall);
        assert!(b.is_user_online(a_id));
        assert!(!b.is_user_available_for_calls(a_id));
        assert!(b.available_users().is_empty());

        a.set_in_call(false).await;
        settle().await;
        assert!(b.is_user_available_for_calls(a_id));
    }

    #[tokio::test]
    async fn test_hidden_page_is_busy() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;

        a.set_visibility(Visibility::Hidden).await;
        settle().await;
        let seen = b.presence_of(a_id).unwrap();
        assert!(!seen.is_available_for_calls);
        assert_eq!(seen.current_activity, Some(Activity::Busy));

        a.set_visibility(Visibility::Visible).await;
        settle().await;
        let seen = b.presence_of(a_id).unwrap();
        assert!(seen.is_available_for_calls);
        assert_eq!(seen.current_activity, Some(Activity::Active));
    }

    #[tokio::test]
    async fn test_profile_fields_are_published() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = PresenceTracker::with_profiles(
            a_id,
            PresenceConfig::default(),
            Arc::new(hub.clone()),
            Arc::new(FixedProfile),
        );
        let b = tracker(&hub, b_id);
        b.connect().await;
        a.connect().await;
        settle().await;

        let seen = b.presence_of(a_id).unwrap();
        assert_eq!(seen.display_name.as_deref(), Some("Ana Souza"));
        assert_eq!(seen.username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;
        settle().await;

        a.disconnect().await;
        a.disconnect().await;
        settle().await;

        assert!(!a.is_online());
        assert!(a.online_users().is_empty());
        assert!(!b.is_user_online(a_id));
        assert_eq!(hub.member_count("user_presence"), 1);
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_swallowed() {
        let a = PresenceTracker::new(
            UserId::new(),
            PresenceConfig::default(),
            Arc::new(FailingProvider),
        );
        a.connect().await;
        assert!(!a.is_online());
        a.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_publishes_away() {
        let hub = MemoryHub::new(64);
        let (a_id, b_id) = (UserId::new(), UserId::new());
        let a = tracker(&hub, a_id);
        let b = tracker(&hub, b_id);
        a.connect().await;
        b.connect().await;
        settle().await;
        assert_eq!(b.presence_of(a_id).unwrap().current_activity, Some(Activity::Active));

        // Heartbeats at 30 s and 60 s; the second one sees 60 s of idle time.
        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(b.presence_of(a_id).unwrap().current_activity, Some(Activity::Away));

        a.record_activity(ActivityKind::Keyboard).await;
        settle().await;
        assert_eq!(b.presence_of(a_id).unwrap().current_activity, Some(Activity::Active));
    }
}

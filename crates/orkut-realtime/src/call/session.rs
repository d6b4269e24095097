//! Call session: the offer/answer state machine for one room.
//!
//! A session owns at most one peer connection and one local stream at a
//! time. Inbound signals are processed in arrival order by a listener task;
//! every state change is published on a `watch` channel and to the
//! optional [`CallObserver`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use orkut_core::config::CallsConfig;
use orkut_core::error::AppError;
use orkut_core::result::AppResult;
use orkut_core::types::{CallType, UserId};

use crate::hub::{BroadcastChannel, ChannelProvider, HubEvent};

use super::ice::IceCandidateBuffer;
use super::media::{MediaConstraints, MediaDevices, MediaStream};
use super::message::{SignalEvent, SignalMessage};
use super::observer::CallObserver;
use super::peer::{
    ConnectionState, IceCandidate, PeerConfig, PeerConnection, PeerConnectionFactory, PeerEvent,
    SessionDescription,
};
use super::state::{CallState, CallStatus};

/// Who is calling whom, in which room.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub room_id: String,
    pub local_user: UserId,
    pub remote_user: UserId,
    pub call_type: CallType,
}

/// Intents emitted by the call UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallIntent {
    Accept,
    Reject,
    ToggleMute,
    ToggleVideo,
    HangUp,
}

/// Backends a session drives.
#[derive(Clone)]
pub struct CallBackends {
    pub channels: Arc<dyn ChannelProvider>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub media: Arc<dyn MediaDevices>,
}

#[derive(Default)]
struct SessionCore {
    peer: Option<Arc<dyn PeerConnection>>,
    remote_description_set: bool,
    pending_offer: Option<SessionDescription>,
    ice: IceCandidateBuffer,
}

struct SessionInner {
    options: CallOptions,
    config: CallsConfig,
    backends: CallBackends,
    observer: Option<Arc<dyn CallObserver>>,
    channel: RwLock<Option<Arc<dyn BroadcastChannel>>>,
    core: tokio::sync::Mutex<SessionCore>,
    state: watch::Sender<CallState>,
    /// Bumped whenever the peer connection is replaced or released.
    generation: AtomicU64,
}

fn decode<T: DeserializeOwned>(data: Option<serde_json::Value>, what: &str) -> Option<T> {
    let Some(data) = data else {
        warn!(what, "Signal is missing its data");
        return None;
    };
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(what, error = %e, "Signal data is malformed");
            None
        }
    }
}

impl SessionInner {
    fn channel(&self) -> Option<Arc<dyn BroadcastChannel>> {
        self.channel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn snapshot(&self) -> CallState {
        self.state.borrow().clone()
    }

    fn status(&self) -> CallStatus {
        self.state.borrow().status
    }

    fn call_id(&self) -> String {
        self.state
            .borrow()
            .current_call_id
            .clone()
            .unwrap_or_else(|| self.options.room_id.clone())
    }

    fn update(&self, f: impl FnOnce(&mut CallState)) {
        self.state.send_modify(f);
        if let Some(observer) = &self.observer {
            observer.on_state_change(&self.snapshot());
        }
    }

    fn report_error(&self, error: &AppError) {
        warn!(
            room_id = %self.options.room_id,
            kind = %error.kind,
            error = %error.message,
            "Call error"
        );
        if let Some(observer) = &self.observer {
            observer.on_error(error);
        }
    }

    async fn send_signal(
        &self,
        event: SignalEvent,
        data: Option<serde_json::Value>,
    ) -> AppResult<()> {
        let channel = self
            .channel()
            .ok_or_else(|| AppError::signaling("Call channel is not connected"))?;
        let message = SignalMessage::new(
            &self.call_id(),
            self.options.local_user,
            self.options.remote_user,
            data,
        );
        channel
            .send(event.as_str(), serde_json::to_value(&message)?)
            .await
    }

    async fn create_peer(
        self: &Arc<Self>,
        core: &mut SessionCore,
    ) -> AppResult<Arc<dyn PeerConnection>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = self
            .backends
            .peers
            .create(&PeerConfig::from(&self.config), tx)
            .await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(watch_peer(Arc::downgrade(self), generation, rx));
        core.peer = Some(peer.clone());
        core.remote_description_set = false;
        Ok(peer)
    }

    async fn acquire_media(&self) -> AppResult<MediaStream> {
        let constraints = MediaConstraints::for_call(self.options.call_type);
        let stream = self.backends.media.get_user_media(&constraints).await?;
        self.update(|s| s.local_stream = Some(stream.clone()));
        Ok(stream)
    }

    async fn attach(&self, peer: &Arc<dyn PeerConnection>, stream: &MediaStream) -> AppResult<()> {
        for track in stream.tracks() {
            peer.add_track(track.clone(), stream).await?;
        }
        Ok(())
    }

    async fn flush_candidates(
        &self,
        core: &mut SessionCore,
        peer: &Arc<dyn PeerConnection>,
        call_id: &str,
    ) {
        let buffered = core.ice.take(call_id);
        if !buffered.is_empty() {
            debug!(call_id, count = buffered.len(), "Applying buffered ICE candidates");
        }
        for candidate in buffered {
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!(call_id, error = %e, "Failed to add ICE candidate");
            }
        }
    }

    /// Stops local media and drops the peer connection without touching the
    /// published status. Buffered remote candidates survive.
    fn release(&self, core: &mut SessionCore) {
        if let Some(stream) = &self.state.borrow().local_stream {
            stream.stop_all();
        }
        if let Some(peer) = core.peer.take() {
            peer.close();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        core.remote_description_set = false;
        core.pending_offer = None;
    }

    /// Releases everything, tells the remote side when a call was active,
    /// and resets to the idle shape.
    async fn teardown(&self, core: &mut SessionCore) {
        let was_active = self.state.borrow().is_call_active;
        self.release(core);
        core.ice.clear();
        if was_active {
            if let Err(e) = self.send_signal(SignalEvent::CallEnd, None).await {
                warn!(room_id = %self.options.room_id, error = %e, "Failed to send call-end");
            }
        }
        let call_type = self.options.call_type;
        self.update(|s| *s = CallState::idle(call_type));
    }

    async fn start_call(self: &Arc<Self>) -> AppResult<()> {
        let mut core = self.core.lock().await;
        if !self.state.borrow().is_idle() {
            return Err(AppError::conflict("A call is already in progress"));
        }
        // The callee only trickles after it has seen our offer.
        core.ice.clear();

        info!(
            room_id = %self.options.room_id,
            to = %self.options.remote_user,
            call_type = %self.options.call_type,
            "Starting call"
        );
        let room_id = self.options.room_id.clone();
        let call_type = self.options.call_type;
        self.update(|s| {
            s.status = CallStatus::Calling;
            s.current_call_id = Some(room_id);
            s.call_type = call_type;
        });

        if let Err(e) = self.send_offer(&mut core).await {
            self.report_error(&e);
            self.teardown(&mut core).await;
            return Err(e);
        }
        Ok(())
    }

    async fn send_offer(self: &Arc<Self>, core: &mut SessionCore) -> AppResult<()> {
        let peer = self.create_peer(core).await?;
        let stream = self.acquire_media().await?;
        self.attach(&peer, &stream).await?;
        let offer = peer.create_offer().await?;
        peer.set_local_description(offer.clone()).await?;
        self.send_signal(SignalEvent::CallOffer, Some(serde_json::to_value(&offer)?))
            .await
    }

    async fn answer_locked(
        self: &Arc<Self>,
        core: &mut SessionCore,
        offer: SessionDescription,
    ) -> AppResult<()> {
        let status = self.status();
        if matches!(status, CallStatus::Calling | CallStatus::Connected) {
            return Err(AppError::conflict(format!("Cannot answer while {status:?}")));
        }

        core.pending_offer = None;
        let room_id = self.options.room_id.clone();
        self.update(|s| {
            s.status = CallStatus::Ringing;
            s.current_call_id.get_or_insert(room_id);
        });

        let call_id = self.call_id();
        match self.send_answer(core, offer, &call_id).await {
            Ok(()) => {
                info!(call_id = %call_id, "Call answered");
                self.update(|s| {
                    s.status = CallStatus::Connected;
                    s.is_call_active = true;
                });
                Ok(())
            }
            Err(e) => {
                self.report_error(&e);
                self.teardown(core).await;
                Err(e)
            }
        }
    }

    async fn send_answer(
        self: &Arc<Self>,
        core: &mut SessionCore,
        offer: SessionDescription,
        call_id: &str,
    ) -> AppResult<()> {
        let peer = self.create_peer(core).await?;
        let stream = self.acquire_media().await?;
        self.attach(&peer, &stream).await?;
        peer.set_remote_description(offer).await?;
        core.remote_description_set = true;
        self.flush_candidates(core, &peer, call_id).await;
        let answer = peer.create_answer().await?;
        peer.set_local_description(answer.clone()).await?;
        self.send_signal(SignalEvent::CallAnswer, Some(serde_json::to_value(&answer)?))
            .await
    }

    async fn answer_call(self: &Arc<Self>, offer: SessionDescription) -> AppResult<()> {
        let mut core = self.core.lock().await;
        self.answer_locked(&mut core, offer).await
    }

    async fn accept_call(self: &Arc<Self>) -> AppResult<()> {
        let mut core = self.core.lock().await;
        if let Some(offer) = core.pending_offer.take() {
            return self.answer_locked(&mut core, offer).await;
        }
        if core.peer.is_some() && !self.state.borrow().is_idle() {
            self.update(|s| {
                s.status = CallStatus::Connected;
                s.is_call_active = true;
            });
            return Ok(());
        }
        Err(AppError::conflict("No incoming call to accept"))
    }

    async fn reject_call(&self) {
        let mut core = self.core.lock().await;
        if self.state.borrow().is_idle() {
            return;
        }
        info!(room_id = %self.options.room_id, "Rejecting call");
        if let Err(e) = self.send_signal(SignalEvent::CallReject, None).await {
            warn!(room_id = %self.options.room_id, error = %e, "Failed to send call-reject");
        }
        self.teardown(&mut core).await;
    }

    async fn end_call(&self) {
        let mut core = self.core.lock().await;
        if self.state.borrow().is_idle() && core.peer.is_none() {
            return;
        }
        info!(room_id = %self.options.room_id, "Ending call");
        self.teardown(&mut core).await;
    }

    async fn on_offer(self: &Arc<Self>, message: SignalMessage) {
        let Some(offer) = decode::<SessionDescription>(message.data, "offer") else {
            return;
        };
        let mut core = self.core.lock().await;
        match self.status() {
            CallStatus::Idle => {
                info!(call_id = %message.call_id, from = %message.from, "Incoming call");
                core.pending_offer = Some(offer.clone());
                let call_id = message.call_id.clone();
                self.update(|s| {
                    s.status = CallStatus::Ringing;
                    s.current_call_id = Some(call_id);
                });
                if let Some(observer) = &self.observer {
                    observer.on_incoming_call(&message.call_id, message.from);
                }
                if self.config.auto_answer {
                    let _ = self.answer_locked(&mut core, offer).await;
                }
            }
            CallStatus::Calling if self.options.local_user < message.from => {
                info!(call_id = %message.call_id, "Both sides dialed, answering the remote offer");
                self.release(&mut core);
                let call_type = self.options.call_type;
                self.update(|s| *s = CallState::idle(call_type));
                let _ = self.answer_locked(&mut core, offer).await;
            }
            status => {
                debug!(call_id = %message.call_id, ?status, "Ignoring offer");
            }
        }
    }

    async fn on_answer(&self, message: SignalMessage) {
        let Some(answer) = decode::<SessionDescription>(message.data, "answer") else {
            return;
        };
        let mut core = self.core.lock().await;
        let Some(peer) = core.peer.clone() else {
            debug!(call_id = %message.call_id, "Answer without a peer connection");
            return;
        };
        if self.status() != CallStatus::Calling {
            debug!(call_id = %message.call_id, "Ignoring answer outside of calling");
            return;
        }
        if let Err(e) = peer.set_remote_description(answer).await {
            self.report_error(&e);
            self.teardown(&mut core).await;
            return;
        }
        core.remote_description_set = true;
        self.flush_candidates(&mut core, &peer, &message.call_id).await;
        info!(call_id = %message.call_id, "Call connected");
        self.update(|s| {
            s.status = CallStatus::Connected;
            s.is_call_active = true;
        });
    }

    async fn on_candidate(&self, message: SignalMessage) {
        let Some(candidate) = decode::<IceCandidate>(message.data, "candidate") else {
            return;
        };
        let mut core = self.core.lock().await;
        // Trickled candidates can overtake the offer they belong to.
        match core.peer.clone() {
            Some(peer) if core.remote_description_set => {
                if let Err(e) = peer.add_ice_candidate(candidate).await {
                    warn!(call_id = %message.call_id, error = %e, "Failed to add ICE candidate");
                }
            }
            _ => {
                core.ice.push(&message.call_id, candidate);
                debug!(
                    call_id = %message.call_id,
                    buffered = core.ice.len(&message.call_id),
                    "Buffered early ICE candidate"
                );
            }
        }
    }

    async fn handle_signal(self: &Arc<Self>, event: &str, payload: serde_json::Value) {
        let Some(kind) = SignalEvent::parse(event) else {
            return;
        };
        let message: SignalMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(event, error = %e, "Malformed signal");
                return;
            }
        };
        if !message.is_addressed_to(self.options.local_user) {
            debug!(event, to = %message.to, "Ignoring signal for another user");
            return;
        }

        match kind {
            SignalEvent::CallOffer => self.on_offer(message).await,
            SignalEvent::CallAnswer => self.on_answer(message).await,
            SignalEvent::IceCandidate => self.on_candidate(message).await,
            SignalEvent::CallEnd | SignalEvent::CallReject => {
                info!(event, call_id = %message.call_id, "Remote side ended the call");
                self.end_call().await;
            }
        }
    }

    async fn on_peer_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::IceCandidate(candidate) => {
                let data = match serde_json::to_value(&candidate) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode ICE candidate");
                        return;
                    }
                };
                if let Err(e) = self.send_signal(SignalEvent::IceCandidate, Some(data)).await {
                    warn!(
                        room_id = %self.options.room_id,
                        error = %e,
                        "Failed to send ICE candidate"
                    );
                }
            }
            PeerEvent::Track(stream) => {
                debug!(room_id = %self.options.room_id, "Remote stream received");
                self.update(|s| s.remote_stream = Some(stream));
            }
            PeerEvent::ConnectionState(ConnectionState::Connected) => {
                if !self.state.borrow().is_idle() {
                    self.update(|s| {
                        s.status = CallStatus::Connected;
                        s.is_call_active = true;
                    });
                }
            }
            PeerEvent::ConnectionState(
                state @ (ConnectionState::Disconnected | ConnectionState::Failed),
            ) => {
                warn!(room_id = %self.options.room_id, ?state, "Peer connection lost");
                self.report_error(&AppError::peer_connection(format!(
                    "Peer connection {state:?}"
                )));
                self.end_call().await;
            }
            PeerEvent::ConnectionState(state) => {
                debug!(room_id = %self.options.room_id, ?state, "Peer connection state");
            }
        }
    }
}

async fn listen(inner: Weak<SessionInner>, mut events: mpsc::Receiver<HubEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let HubEvent::Broadcast { event, payload } = event {
            inner.handle_signal(&event, payload).await;
        }
    }
}

async fn watch_peer(
    inner: Weak<SessionInner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<PeerEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if inner.generation.load(Ordering::SeqCst) != generation {
            break;
        }
        inner.on_peer_event(event).await;
    }
}

/// One participant's side of a call room.
///
/// `connect` joins the `{prefix}{room_id}` channel through the injected
/// [`ChannelProvider`]; `dispose` (or dropping the session) ends any call
/// and leaves it.
pub struct CallSession {
    inner: Arc<SessionInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("options", &self.inner.options)
            .field("status", &self.inner.status())
            .finish()
    }
}

impl CallSession {
    pub fn new(options: CallOptions, config: CallsConfig, backends: CallBackends) -> Self {
        Self::build(options, config, backends, None)
    }

    /// Like [`CallSession::new`], reporting state changes, errors, and
    /// incoming calls to `observer`.
    pub fn with_observer(
        options: CallOptions,
        config: CallsConfig,
        backends: CallBackends,
        observer: Arc<dyn CallObserver>,
    ) -> Self {
        Self::build(options, config, backends, Some(observer))
    }

    fn build(
        options: CallOptions,
        config: CallsConfig,
        backends: CallBackends,
        observer: Option<Arc<dyn CallObserver>>,
    ) -> Self {
        let (state, _) = watch::channel(CallState::idle(options.call_type));
        Self {
            inner: Arc::new(SessionInner {
                options,
                config,
                backends,
                observer,
                channel: RwLock::new(None),
                core: tokio::sync::Mutex::new(SessionCore::default()),
                state,
                generation: AtomicU64::new(0),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Topic of this session's room.
    pub fn topic(&self) -> String {
        format!("{}{}", self.inner.config.room_topic_prefix, self.inner.options.room_id)
    }

    /// Joins the room channel and starts processing signals.
    pub async fn connect(&self) -> AppResult<()> {
        if self.inner.channel().is_some() {
            return Ok(());
        }
        let topic = self.topic();
        let channel = match self.inner.backends.channels.channel(&topic, None).await {
            Ok(channel) => channel,
            Err(e) => {
                self.inner.report_error(&e);
                return Err(e);
            }
        };
        let events = channel.take_events();
        *self
            .inner
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(channel);

        if let Some(events) = events {
            let task = tokio::spawn(listen(Arc::downgrade(&self.inner), events));
            if let Some(old) = self
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(task)
            {
                old.abort();
            }
        }
        debug!(topic = %topic, user = %self.inner.options.local_user, "Call channel connected");
        Ok(())
    }

    /// Ends any call and leaves the room channel.
    pub async fn dispose(&self) {
        self.inner.end_call().await;
        if let Some(task) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        let channel = self
            .inner
            .channel
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(channel) = channel {
            if let Err(e) = channel.unsubscribe().await {
                debug!(error = %e, "Unsubscribe failed during dispose");
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> CallState {
        self.inner.snapshot()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.inner.state.subscribe()
    }

    /// Dials the remote user. Only valid while idle.
    pub async fn start_call(&self) -> AppResult<()> {
        self.inner.start_call().await
    }

    /// Answers `offer` and marks the call connected once the answer is sent.
    pub async fn answer_call(&self, offer: SessionDescription) -> AppResult<()> {
        self.inner.answer_call(offer).await
    }

    /// Answers the ringing offer, or confirms an already negotiated call.
    pub async fn accept_call(&self) -> AppResult<()> {
        self.inner.accept_call().await
    }

    /// Tells the caller no, then tears down.
    pub async fn reject_call(&self) {
        self.inner.reject_call().await
    }

    /// Stops media, closes the peer connection, and returns to idle.
    pub async fn end_call(&self) {
        self.inner.end_call().await
    }

    /// Flips the local microphone. Returns the new muted flag.
    pub fn toggle_mute(&self) -> bool {
        let state = self.inner.snapshot();
        let Some(track) = state
            .local_stream
            .as_ref()
            .and_then(|s| s.audio_tracks().next().cloned())
        else {
            return state.is_muted;
        };
        let muted = !state.is_muted;
        track.set_enabled(!muted);
        self.inner.update(|s| s.is_muted = muted);
        muted
    }

    /// Flips the local camera. Returns the new video-off flag.
    pub fn toggle_video(&self) -> bool {
        let state = self.inner.snapshot();
        let Some(track) = state
            .local_stream
            .as_ref()
            .and_then(|s| s.video_tracks().next().cloned())
        else {
            return state.is_video_off;
        };
        let off = !state.is_video_off;
        track.set_enabled(!off);
        self.inner.update(|s| s.is_video_off = off);
        off
    }

    /// Applies a UI intent.
    pub async fn handle_intent(&self, intent: CallIntent) -> AppResult<()> {
        match intent {
            CallIntent::Accept => self.accept_call().await?,
            CallIntent::Reject => self.reject_call().await,
            CallIntent::ToggleMute => {
                self.toggle_mute();
            }
            CallIntent::ToggleVideo => {
                self.toggle_video();
            }
            CallIntent::HangUp => self.end_call().await,
        }
        Ok(())
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        if let Some(task) = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        if let Ok(mut core) = self.inner.core.try_lock() {
            self.inner.release(&mut core);
        }
    }
}

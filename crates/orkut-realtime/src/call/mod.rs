//! Call signaling: offer/answer/ICE exchange over a per-room channel and the
//! call state machine built on it.

pub mod ice;
pub mod media;
pub mod message;
pub mod observer;
pub mod peer;
pub mod session;
pub mod state;

pub use ice::IceCandidateBuffer;
pub use media::{
    AudioConstraints, MediaConstraints, MediaDevices, MediaStream, MediaTrack, TrackKind,
};
pub use message::{SignalEvent, SignalMessage};
pub use observer::CallObserver;
pub use peer::{
    ConnectionState, IceCandidate, PeerConfig, PeerConnection, PeerConnectionFactory, PeerEvent,
    SdpType, SessionDescription,
};
pub use session::{CallBackends, CallIntent, CallOptions, CallSession};
pub use state::{CallState, CallStatus};

//! Client-side presence tracking over the shared presence topic.

pub mod activity;
pub mod record;
pub mod tracker;

pub use activity::{ActivityClock, ActivityKind, Visibility};
pub use record::{Activity, PresenceRecord, PresenceUpdate, ProfileLookup, ProfileSummary};
pub use tracker::PresenceTracker;

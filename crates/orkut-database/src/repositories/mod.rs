//! PostgreSQL repository implementations of the store traits.

pub mod call_signal;
pub mod notification;
pub mod presence;
pub mod profile;

pub use call_signal::CallSignalRepository;
pub use notification::NotificationRepository;
pub use presence::PresenceRepository;
pub use profile::ProfileRepository;

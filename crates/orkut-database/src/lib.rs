//! # orkut-database
//!
//! PostgreSQL connection management, the store traits consumed by the API
//! layer, their `sqlx` repository implementations, and an in-memory store
//! used for local development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod models;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{CallSignalStore, NotificationStore, PresenceStore, ProfileStore};

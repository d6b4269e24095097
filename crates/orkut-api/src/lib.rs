//! # orkut-api
//!
//! HTTP API layer for the Orkut call services built on Axum.
//!
//! Serves the call-notification fallback, the persisted presence list,
//! health, and the realtime WebSocket upgrade.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::{AppState, Stores};

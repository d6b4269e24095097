//! # orkut-core
//!
//! Core crate for the Orkut call services. Contains configuration schemas,
//! typed identifiers, call-level shared types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Orkut crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

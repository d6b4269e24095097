//! Core type definitions used across the Orkut workspace.

pub mod call;
pub mod id;

pub use call::{CallAction, CallType};
pub use id::*;

//! Route handlers organized by domain.

pub mod call_notification;
pub mod health;
pub mod presence;
pub mod ws;

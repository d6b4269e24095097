//! # orkut-auth
//!
//! Verification of the backend's bearer tokens.
//!
//! ## Modules
//!
//! - `jwt`: access-token claims, HS256 decoding, and a development encoder

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};

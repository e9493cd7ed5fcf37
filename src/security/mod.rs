//! Access control for the capture endpoint.
//!
//! # Design Decisions
//! - One optional shared secret, fixed at startup
//! - Checks run on headers before any body bytes are read
//! - Every rejection is a plain 401; the specific reason only reaches the event sink

pub mod auth;

pub use auth::{auth_gate, authorize, AuthRejection, AuthState, SharedSecret};

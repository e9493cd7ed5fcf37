//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! auth gate / capture handler
//!     → CaptureEvent
//!     → EventSink (injected; TracingSink by default)
//!         → tracing record (stdout via tracing-subscriber)
//!         → metrics counter (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - Sinks are observers only: emitting never fails and never alters a response
//! - Neither the shared secret nor a presented token is ever an event field

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{CaptureEvent, EventSink, SharedSink, TracingSink};

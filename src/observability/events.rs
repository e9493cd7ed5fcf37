//! Capture events and the sink they are emitted to.
//!
//! Handlers never log directly. They describe what happened as a
//! [`CaptureEvent`] and hand it to whatever [`EventSink`] was injected at
//! startup.

use std::sync::Arc;

use crate::observability::metrics;
use crate::security::AuthRejection;

/// Something worth recording about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Admitted request about to be read.
    RequestReceived { method: String, path: String, query: String },
    /// Auth gate turned the request away.
    Unauthorized { reason: AuthRejection },
    BodyReadFailed { path: String, error: String },
    HeaderEncodeFailed { path: String, error: String },
    StoreFailed { path: String, error: String },
    /// Record committed.
    Captured { path: String, body_bytes: usize },
}

impl CaptureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::Unauthorized { .. } => "unauthorized",
            Self::BodyReadFailed { .. } => "body_read_failed",
            Self::HeaderEncodeFailed { .. } => "header_encode_failed",
            Self::StoreFailed { .. } => "store_failed",
            Self::Captured { .. } => "captured",
        }
    }
}

/// Receiver of capture events. Must never influence request handling.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CaptureEvent);
}

pub type SharedSink = Arc<dyn EventSink>;

/// Default sink: one `tracing` record per event plus an outcome counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CaptureEvent) {
        let name = event.name();
        match &event {
            CaptureEvent::RequestReceived { method, path, query } => {
                tracing::info!(event = name, method = %method, path = %path, query = %query, "Incoming request");
                return;
            }
            CaptureEvent::Unauthorized { reason } => {
                tracing::warn!(event = name, reason = reason.code(), "Rejected request: {}", reason);
            }
            CaptureEvent::BodyReadFailed { path, error } => {
                tracing::error!(event = name, path = %path, error = %error, "Error reading request body");
            }
            CaptureEvent::HeaderEncodeFailed { path, error } => {
                tracing::error!(event = name, path = %path, error = %error, "Error serializing headers");
            }
            CaptureEvent::StoreFailed { path, error } => {
                tracing::error!(event = name, path = %path, error = %error, "Error inserting request");
            }
            CaptureEvent::Captured { path, body_bytes } => {
                tracing::debug!(event = name, path = %path, body_bytes = *body_bytes, "Request captured");
            }
        }
        metrics::record_outcome(name);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps every event for later assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<CaptureEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<CaptureEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.events().iter().map(CaptureEvent::name).collect()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: CaptureEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

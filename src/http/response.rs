//! Fixed response bodies and error-to-status mapping.
//!
//! Clients only ever see 200, 401 or 500 with one of the bodies below.
//! Error detail goes to the event sink, never into a response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::observability::CaptureEvent;
use crate::storage::StorageError;

pub const OK_BODY: &str = "OK!";
pub const UNAUTHORIZED_BODY: &str = "Unauthorized";
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// Acknowledgment for a committed record.
pub fn captured() -> Response {
    (StatusCode::OK, OK_BODY).into_response()
}

/// Per-request failure inside the capture handler.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Transport failure or body over the configured cap.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error("failed to serialize headers: {0}")]
    HeaderEncode(#[from] serde_json::Error),

    #[error("failed to store request: {0}")]
    Storage(#[from] StorageError),
}

impl CaptureError {
    /// Event describing this failure for `path`.
    pub fn to_event(&self, path: &str) -> CaptureEvent {
        let path = path.to_string();
        let error = self.to_string();
        match self {
            Self::BodyRead(_) => CaptureEvent::BodyReadFailed { path, error },
            Self::HeaderEncode(_) => CaptureEvent::HeaderEncodeFailed { path, error },
            Self::Storage(_) => CaptureEvent::StoreFailed { path, error },
        }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
    }
}

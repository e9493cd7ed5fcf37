//! The capture handler: request in, one durable record out.
//!
//! # Steps
//! 1. Emit `request_received` with path and canonical query
//! 2. Read the whole body (bounded by `max_body_bytes`)
//! 3. Encode headers, build the [`Record`]
//! 4. Insert once and wait for the commit
//! 5. Answer `200 OK!`, or `500` if any step failed
//!
//! Nothing is written to the store unless the body was read completely, and
//! no response leaves before the insert attempt has finished.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::http::response::{self, CaptureError};
use crate::observability::{CaptureEvent, SharedSink};
use crate::storage::{canonical_query, decoded_path, Record, RecordStore, SerializedHeaders};

/// Dependencies of the capture handler, built once at startup.
#[derive(Clone)]
pub struct CaptureState {
    pub store: Arc<dyn RecordStore>,
    pub sink: SharedSink,
    pub max_body_bytes: usize,
}

impl CaptureState {
    pub fn new(store: Arc<dyn RecordStore>, sink: SharedSink, max_body_bytes: usize) -> Self {
        Self {
            store,
            sink,
            max_body_bytes,
        }
    }
}

pub async fn capture_handler(State(state): State<CaptureState>, request: Request<Body>) -> Response {
    let path = decoded_path(request.uri().path());

    match capture(&state, request).await {
        Ok(body_bytes) => {
            state.sink.emit(CaptureEvent::Captured { path, body_bytes });
            response::captured()
        }
        Err(err) => {
            state.sink.emit(err.to_event(&path));
            err.into_response()
        }
    }
}

/// Returns the captured body length on success.
async fn capture(state: &CaptureState, request: Request<Body>) -> Result<usize, CaptureError> {
    let (parts, body) = request.into_parts();
    let path = decoded_path(parts.uri.path());
    let query = canonical_query(parts.uri.query());

    state.sink.emit(CaptureEvent::RequestReceived {
        method: parts.method.to_string(),
        path: path.clone(),
        query: query.clone(),
    });

    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(CaptureError::BodyRead)?;
    let headers = SerializedHeaders::from_header_map(&parts.headers).encode()?;

    let body_bytes = body.len();
    let record = Record::new(parts.method.as_str(), &path, headers, query, body);
    state.store.insert(record).await?;

    Ok(body_bytes)
}

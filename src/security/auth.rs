//! Bearer-token gate in front of the capture handler.
//!
//! The decision looks at headers only. A rejected request is answered
//! before its body is ever polled, whatever its size.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::UNAUTHORIZED_BODY;
use crate::observability::{CaptureEvent, SharedSink};

/// Process-wide bearer secret. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    /// `None` for an empty value, which disables authentication.
    pub fn new(value: &str) -> Option<Self> {
        (!value.is_empty()).then(|| Self(Arc::from(value)))
    }

    fn matches(&self, token: &str) -> bool {
        &*self.0 == token
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("invalid Authorization header format")]
    MalformedHeader,

    #[error("invalid API key")]
    BadKey,
}

impl AuthRejection {
    /// Stable label for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::BadKey => "bad_key",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY).into_response()
    }
}

/// Admit or reject based on the `Authorization` header.
///
/// With no secret every request is admitted. Otherwise the header must be
/// exactly `<scheme> <token>` split on a single space, the scheme equal to
/// `bearer` ignoring case, and the token equal to the secret.
pub fn authorize(secret: Option<&SharedSecret>, headers: &HeaderMap) -> Result<(), AuthRejection> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let value = match headers.get(AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthRejection::MissingHeader),
    };
    let value = value.to_str().map_err(|_| AuthRejection::MalformedHeader)?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthRejection::MalformedHeader);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::MalformedHeader);
    }

    if secret.matches(token) {
        Ok(())
    } else {
        Err(AuthRejection::BadKey)
    }
}

/// State for the auth gate middleware.
#[derive(Clone)]
pub struct AuthState {
    pub secret: Option<SharedSecret>,
    pub sink: SharedSink,
}

impl AuthState {
    pub fn new(secret: Option<SharedSecret>, sink: SharedSink) -> Self {
        Self { secret, sink }
    }
}

pub async fn auth_gate(State(state): State<AuthState>, req: Request<Body>, next: Next) -> Response {
    match authorize(state.secret.as_ref(), req.headers()) {
        Ok(()) => next.run(req).await,
        Err(reason) => {
            state.sink.emit(CaptureEvent::Unauthorized { reason });
            reason.into_response()
        }
    }
}

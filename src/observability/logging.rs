//! Structured logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and the HTTP trace layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(log_level: &str) {
    let fallback = format!("request_capture={log_level},tower_http={log_level}");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

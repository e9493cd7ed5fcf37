//! Startup orchestration.
//!
//! Open store → provision schema → metrics exporter → bind listener.
//! Any failure is a [`BootstrapError`]; nothing is left half-running because
//! the listener is bound last and serving only starts after this returns.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::CaptureConfig;
use crate::http::HttpServer;
use crate::observability::{metrics, SharedSink};
use crate::security::SharedSecret;
use crate::storage::{SqliteStore, StorageError};

/// Fatal startup failure.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to open record store at {path}: {source}")]
    OpenStore {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to provision schema: {0}")]
    Provision(#[source] StorageError),

    #[error("invalid metrics address {address:?}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fully initialized service, ready to serve.
pub struct Service {
    pub server: HttpServer,
    pub listener: TcpListener,
    pub store: SqliteStore,
}

impl Service {
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }
}

/// Build every dependency once and hand them to the server explicitly.
pub async fn bootstrap(config: &CaptureConfig, sink: SharedSink) -> Result<Service, BootstrapError> {
    let store = SqliteStore::open(
        Path::new(&config.storage.path),
        Duration::from_millis(config.storage.busy_timeout_ms),
    )
    .map_err(|source| BootstrapError::OpenStore {
        path: config.storage.path.clone(),
        source,
    })?;
    store.provision().map_err(BootstrapError::Provision)?;
    tracing::info!(path = %config.storage.path, "Record store ready");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|source| BootstrapError::MetricsAddress {
                address: config.observability.metrics_address.clone(),
                source,
            })?;
        metrics::init_metrics(addr)?;
    }

    let secret = SharedSecret::new(&config.auth.api_key);
    if secret.is_none() {
        tracing::warn!("No API key configured, authentication disabled");
    }

    let server = HttpServer::new(
        Arc::new(store.clone()),
        secret,
        sink,
        config.limits.max_body_bytes,
    );

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| BootstrapError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    Ok(Service {
        server,
        listener,
        store,
    })
}

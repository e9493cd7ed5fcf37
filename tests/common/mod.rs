//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use request_capture::config::CaptureConfig;
use request_capture::lifecycle::{bootstrap, Shutdown};
use request_capture::observability::TracingSink;
use request_capture::storage::SqliteStore;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A capture server running on an ephemeral localhost port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: SqliteStore,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

/// Start a server with a fresh database. An empty `api_key` disables auth.
pub async fn start_server(api_key: &str) -> TestServer {
    let dir = tempfile::tempdir().unwrap();

    let mut config = CaptureConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.storage.path = dir.path().join("requests.db").display().to_string();
    config.auth.api_key = api_key.into();

    let service = bootstrap(&config, Arc::new(TracingSink)).await.unwrap();
    let addr = service.local_addr().unwrap();
    let store = service.store.clone();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(service.server.run(service.listener, server_shutdown));

    TestServer {
        addr,
        store,
        shutdown,
        handle,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router: every path and method goes to the capture handler
//! - Put the auth gate in front of it
//! - Serve on the bound listener until shutdown is signalled

use std::sync::Arc;

use axum::{middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::capture::{capture_handler, CaptureState};
use crate::observability::SharedSink;
use crate::security::{auth_gate, AuthState, SharedSecret};
use crate::storage::RecordStore;

/// HTTP front-end for the capture service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Wire the gate and handler around explicitly provided dependencies.
    pub fn new(
        store: Arc<dyn RecordStore>,
        secret: Option<SharedSecret>,
        sink: SharedSink,
        max_body_bytes: usize,
    ) -> Self {
        let auth = AuthState::new(secret, sink.clone());
        let capture = CaptureState::new(store, sink, max_body_bytes);

        Self {
            router: Self::build_router(auth, capture),
        }
    }

    fn build_router(auth: AuthState, capture: CaptureState) -> Router {
        Router::new()
            .route("/", any(capture_handler))
            .route("/{*path}", any(capture_handler))
            .with_state(capture)
            .layer(middleware::from_fn_with_state(auth, auth_gate))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until a value arrives on `shutdown` (or its sender is dropped),
    /// then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::events::testing::RecordingSink;
    use crate::storage::SqliteStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_server(secret: &str) -> (HttpServer, SqliteStore, Arc<RecordingSink>) {
        let store = SqliteStore::open_in_memory().unwrap();
        store.provision().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let server = HttpServer::new(
            Arc::new(store.clone()),
            SharedSecret::new(secret),
            sink.clone(),
            1024,
        );
        (server, store, sink)
    }

    fn hook_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .uri("/hooks/github?event=push")
            .header("X-Event", "push");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_open_server_admits_any_authorization() {
        let (server, store, _) = test_server("");

        for auth in [None, Some("Bearer whatever"), Some("garbage")] {
            let response = server.router().oneshot(hook_request(auth)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_secret_without_header_is_401() {
        let (server, store, sink) = test_server("abc123");

        let response = server.router().oneshot(hook_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(sink.names(), ["unauthorized"]);
    }

    #[tokio::test]
    async fn test_secret_with_bearer_is_captured() {
        let (server, store, _) = test_server("abc123");

        let response = server
            .router()
            .oneshot(hook_request(Some("Bearer abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let row = store.get(1).await.unwrap().unwrap();
        assert_eq!(row.path, "/hooks/github");
        assert_eq!(row.query, "event=push");
    }

    #[tokio::test]
    async fn test_every_method_is_routed() {
        let (server, store, _) = test_server("");

        for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
            let request = Request::builder()
                .method(method)
                .uri("/a/b/c")
                .body(Body::empty())
                .unwrap();
            let response = server.router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "method {method}");
        }

        let methods: Vec<_> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .rev()
            .filter_map(|r| r.method)
            .collect();
        assert_eq!(methods, ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]);
    }
}

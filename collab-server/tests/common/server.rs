//! Test server harness for integration tests.
//!
//! Spins up a real Axum server on a random port so tests can exercise the
//! collaboration endpoint with actual WebSocket clients.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use collab_server::{health, routes, session, AppState};

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or the server fails to bind.
    pub async fn start() -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let state = AppState::default();

        let app = Router::new()
            .route("/health/live", get(health::liveness))
            .route("/health/ready", get(health::readiness))
            .route("/ws/collaboration", get(session::collaboration_handler))
            .route("/api/stats", get(routes::get_stats))
            .route(
                "/api/projects/{project_id}/state",
                get(routes::get_project_state),
            )
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
            .with_state(state.clone());

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Get the server's socket address.
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket URL for joining a project as a user.
    pub fn ws_url(&self, project_id: &str, user_id: &str, user_name: &str) -> String {
        format!(
            "ws://{}/ws/collaboration?projectId={}&userId={}&userName={}",
            self.addr, project_id, user_id, user_name
        )
    }

    /// Access the shared state for test assertions.
    #[allow(dead_code)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}

//! Integration tests for the Portico gateway
//!
//! End-to-end tests exercising the full stack in-process:
//! registry lookup, connection resolution and caching, path routing,
//! direct forwarding, and composite fan-out aggregation.
//!
//! Everything runs against ephemeral-port axum servers, so the suite
//! needs no Consul agent and no fixed ports.
//!
//! # Test Structure
//!
//! - `gateway_integration_test.rs` - routing, pass-through, aggregation,
//!   and self-healing through the public HTTP surface
//! - `registry_lifecycle_test.rs` - registration/health/lookup round
//!   trips as the gateway observes them

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// An axum server on an ephemeral port that shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Bind `router` to an ephemeral localhost port and serve it.
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Shut down and wait for the server task to finish. Used by the
    /// self-healing tests that need the port to actually go dead.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

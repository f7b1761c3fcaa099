//! Health Check Server - Liveness, Readiness and Metrics
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness follows
//! the stream connection: 503 while disconnected or reconnecting.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use super::prometheus::StreamMetrics;

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    /// Metrics shared with the stream adapter.
    metrics: Arc<StreamMetrics>,
    /// Bind address, e.g. `0.0.0.0:9090`.
    bind_address: String,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(metrics: Arc<StreamMetrics>, bind_address: impl Into<String>) -> Self {
        Self {
            metrics,
            bind_address: bind_address.into(),
        }
    }

    /// Routes served by the health server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(Arc::clone(&self.metrics))
    }

    /// Serve until a shutdown signal arrives.
    ///
    /// # Errors
    /// Fails if the address cannot be bound.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 only while the stream is connected.
    async fn readiness(State(metrics): State<Arc<StreamMetrics>>) -> impl IntoResponse {
        if metrics.is_connected() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(metrics): State<Arc<StreamMetrics>>) -> impl IntoResponse {
        metrics.render()
    }
}

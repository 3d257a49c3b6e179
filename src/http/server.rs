//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the liveness and site handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::pipeline::{serve_site, RequestPipeline};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::spans::make_request_span;
use crate::storage::{build_store, ObjectGateway, ObjectStore, StorageError};

/// Fixed liveness response body.
pub const LIVENESS_BODY: &str = "ok";

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    pipeline: Arc<RequestPipeline>,
}

impl HttpServer {
    /// Create a server over an explicit storage backend.
    pub fn new(config: GatewayConfig, store: Arc<dyn ObjectStore>) -> Self {
        let gateway = ObjectGateway::new(store, config.storage.bucket.clone());
        let pipeline = Arc::new(RequestPipeline::from_config(&config, gateway));
        let router = Self::build_router(&config, pipeline.clone());
        Self { router, pipeline }
    }

    /// Create a server with the backend named in the configuration.
    pub fn from_config(config: GatewayConfig) -> Result<Self, StorageError> {
        let store = build_store(&config.storage)?;
        Ok(Self::new(config, store))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, pipeline: Arc<RequestPipeline>) -> Router {
        Router::new()
            .route(&config.health.path, any(liveness))
            .route("/", any(serve_site))
            .route("/{*path}", any(serve_site))
            .with_state(pipeline)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Run the server until a shutdown notification arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let routes = self.pipeline.routes();
        tracing::info!(
            address = %addr,
            bucket = %self.pipeline.gateway().bucket(),
            backend = self.pipeline.gateway().backend(),
            sites = routes.len(),
            routes_version = %routes.version(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness probe: always 200, never consults routing or storage.
async fn liveness() -> &'static str {
    LIVENESS_BODY
}

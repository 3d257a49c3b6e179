//! Per-request resolution and serving.
//!
//! # States
//! ```text
//! RESOLVING_HOST → LOOKING_UP_ROUTE → RESOLVING_PATH → CHECKING_EXISTENCE → STREAMING → DONE
//!                        │                  │                 │
//!                        ▼                  ▼                 ▼
//!                   NOT_FOUND (404)   BAD_REQUEST (400)  NOT_FOUND (404) / INTERNAL_ERROR (500)
//! ```
//!
//! # Design Decisions
//! - The pipeline owns only immutable state and is shared through `Arc`
//! - Every failure is turned into a response here; nothing propagates to
//!   the server loop
//! - Storage is never contacted for an unmapped host or a rejected path

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request};
use axum::response::{IntoResponse, Response};

use crate::config::schema::DEFAULT_CACHE_CONTROL;
use crate::config::GatewayConfig;
use crate::http::error::GatewayError;
use crate::http::request::request_id;
use crate::http::response::{monitor_stream, object_response};
use crate::observability::metrics;
use crate::routing::{HostResolver, PathResolver, ResolvedRequest, RouteTable};
use crate::storage::{ObjectGateway, StorageError};

/// Immutable components serving every request.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    hosts: HostResolver,
    routes: Arc<RouteTable>,
    paths: PathResolver,
    gateway: ObjectGateway,
    cache_control: HeaderValue,
}

impl RequestPipeline {
    pub fn new(
        hosts: HostResolver,
        routes: Arc<RouteTable>,
        paths: PathResolver,
        gateway: ObjectGateway,
        cache_control: HeaderValue,
    ) -> Self {
        Self {
            hosts,
            routes,
            paths,
            gateway,
            cache_control,
        }
    }

    /// Assemble a pipeline from validated configuration and a gateway.
    pub fn from_config(config: &GatewayConfig, gateway: ObjectGateway) -> Self {
        // Validation rejects unrepresentable values; only unvalidated configs land here.
        let cache_control = config.cache.header_value().unwrap_or_else(|_| {
            tracing::warn!(
                value = %config.cache.cache_control,
                "Invalid cache-control value, using the default"
            );
            HeaderValue::from_static(DEFAULT_CACHE_CONTROL)
        });

        Self::new(
            HostResolver::new(config.routing.host_trust),
            Arc::new(RouteTable::from_config(&config.routing)),
            PathResolver::new(config.routing.index_document.clone()),
            gateway,
            cache_control,
        )
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn gateway(&self) -> &ObjectGateway {
        &self.gateway
    }

    /// Host, route and path stages. Pure; never touches storage.
    pub fn resolve(
        &self,
        headers: &HeaderMap,
        raw_path: &str,
    ) -> Result<ResolvedRequest, GatewayError> {
        // RESOLVING_HOST
        let hostname = self.hosts.resolve(headers);

        // LOOKING_UP_ROUTE
        let prefix = self
            .routes
            .lookup(&hostname)
            .ok_or_else(|| GatewayError::RoutingMiss {
                host: hostname.clone(),
            })?;

        // RESOLVING_PATH
        Ok(self.paths.resolve(&hostname, prefix, raw_path)?)
    }

    /// Run the full pipeline for one request.
    pub async fn handle(
        &self,
        method: &Method,
        headers: &HeaderMap,
        raw_path: &str,
    ) -> Result<Response, GatewayError> {
        let request_id = request_id(headers);
        let resolved = self.resolve(headers, raw_path)?;

        tracing::debug!(
            request_id = %request_id,
            host = %resolved.hostname,
            path = %resolved.raw_path,
            key = %resolved.object_key,
            spa_fallback = !resolved.has_extension,
            "Resolved object key"
        );

        let key = resolved.object_key;

        // CHECKING_EXISTENCE
        let exists = self
            .gateway
            .exists(&key)
            .await
            .map_err(|e| GatewayError::storage("exists", e))?;
        if !exists {
            return Err(GatewayError::ObjectNotFound { key });
        }

        // STREAMING
        let metadata = self
            .gateway
            .metadata(&key)
            .await
            .map_err(|e| not_found_or_storage("metadata", &key, e))?;

        let body = if *method == Method::HEAD {
            None
        } else {
            let stream = self
                .gateway
                .open_stream(&key)
                .await
                .map_err(|e| not_found_or_storage("stream", &key, e))?;
            Some(Body::from_stream(monitor_stream(
                stream,
                key.clone(),
                request_id.to_string(),
            )))
        };

        object_response(&metadata, &self.cache_control, body)
            .map_err(|e| GatewayError::storage("metadata", e))
    }
}

/// An object deleted between the existence check and the read is still a 404.
fn not_found_or_storage(stage: &'static str, key: &str, err: StorageError) -> GatewayError {
    match err {
        StorageError::NotFound => GatewayError::ObjectNotFound { key: key.to_string() },
        other => GatewayError::storage(stage, other),
    }
}

/// Axum handler: every non-liveness request lands here.
pub async fn serve_site(
    State(pipeline): State<Arc<RequestPipeline>>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, _body) = request.into_parts();
    let request_id = request_id(&parts.headers);
    let path = parts.uri.path();

    match pipeline.handle(&parts.method, &parts.headers, path).await {
        Ok(response) => {
            tracing::info!(request_id = %request_id, path = %path, status = 200, "Serving object");
            metrics::record_request(200, "served", start_time);
            response
        }
        Err(err) => {
            log_failure(request_id, path, &err);
            if let GatewayError::Storage { stage, .. } = &err {
                metrics::record_storage_error(*stage);
            }
            metrics::record_request(err.status().as_u16(), err.outcome(), start_time);
            err.into_response()
        }
    }
}

fn log_failure(request_id: &str, path: &str, err: &GatewayError) {
    match err {
        GatewayError::RoutingMiss { host } => {
            tracing::warn!(
                request_id = %request_id,
                host = %host,
                path = %path,
                "Host not found in mapping"
            );
        }
        GatewayError::PathRejected(reason) => {
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                reason = %reason,
                "Rejected request path"
            );
        }
        GatewayError::ObjectNotFound { key } => {
            tracing::info!(request_id = %request_id, key = %key, "File not found");
        }
        GatewayError::Storage { stage, source } => {
            tracing::error!(
                request_id = %request_id,
                path = %path,
                stage = %stage,
                error = %source,
                "Storage failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::storage::MemoryStore;

    fn pipeline() -> RequestPipeline {
        let mut config = GatewayConfig::default();
        config.routing.sites = vec![SiteConfig::new("site.example.com", "site/dist")];
        let store = MemoryStore::new();
        store.insert("bucket", "site/dist/index.html", "<html>home</html>", Some("text/html"));
        RequestPipeline::from_config(&config, ObjectGateway::new(Arc::new(store), "bucket"))
    }

    fn host(name: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_str(name).unwrap());
        headers
    }

    #[test]
    fn resolve_is_pure() {
        let pipeline = pipeline();
        let resolved = pipeline.resolve(&host("SITE.example.com:8080"), "/deep/link").unwrap();
        assert_eq!(resolved.object_key, "site/dist/index.html");

        let err = pipeline.resolve(&host("unknown.example.com"), "/").unwrap_err();
        assert!(matches!(err, GatewayError::RoutingMiss { host } if host == "unknown.example.com"));
    }

    #[tokio::test]
    async fn head_has_headers_without_body() {
        let response = pipeline()
            .handle(&Method::HEAD, &host("site.example.com"), "/")
            .await
            .unwrap();
        assert_eq!(response.headers()["content-length"], "17");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn missing_object_names_key() {
        let err = pipeline()
            .handle(&Method::GET, &host("site.example.com"), "/app.css")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ObjectNotFound { key } if key == "site/dist/app.css"));
    }
}

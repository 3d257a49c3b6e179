//! Request-level failures and their HTTP mapping.
//!
//! | Error            | Status | Log level |
//! |------------------|--------|-----------|
//! | `RoutingMiss`    | 404    | warn      |
//! | `PathRejected`   | 400    | warn      |
//! | `ObjectNotFound` | 404    | info      |
//! | `Storage`        | 500    | error     |
//!
//! Failures after headers are sent never reach this type; see
//! `http::response::monitor_stream`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::routing::PathError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no site mapped for host '{host}'")]
    RoutingMiss { host: String },

    #[error("rejected request path: {0}")]
    PathRejected(#[from] PathError),

    #[error("object '{key}' not found")]
    ObjectNotFound { key: String },

    #[error("storage failure during {stage}: {source}")]
    Storage {
        stage: &'static str,
        #[source]
        source: StorageError,
    },
}

impl GatewayError {
    pub fn storage(stage: &'static str, source: StorageError) -> Self {
        GatewayError::Storage { stage, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RoutingMiss { .. } | GatewayError::ObjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatewayError::PathRejected(_) => StatusCode::BAD_REQUEST,
            GatewayError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            GatewayError::RoutingMiss { .. } => "routing_miss",
            GatewayError::PathRejected(_) => "path_rejected",
            GatewayError::ObjectNotFound { .. } => "object_not_found",
            GatewayError::Storage { .. } => "storage_error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = match &self {
            GatewayError::RoutingMiss { host } => format!("Host not found: {host}"),
            GatewayError::PathRejected(_) => "Bad Request".to_string(),
            GatewayError::ObjectNotFound { key } => format!("File not found: {key}"),
            // Details stay in the logs.
            GatewayError::Storage { .. } => "Internal Server Error".to_string(),
        };
        (self.status(), body).into_response()
    }
}

//! Object-storage subsystem.
//!
//! # Data Flow
//! ```text
//! RequestPipeline
//!     → ObjectGateway (fixed bucket, content-type default)
//!     → dyn ObjectStore
//!         → gcs.rs        (JSON API over reqwest)
//!         → fs.rs         (<root>/<bucket>/<key> on local disk)
//!         → memory.rs     (in-process map)
//! ```
//!
//! # Design Decisions
//! - Read-only: the gateway never creates, updates or deletes objects
//! - "Not found" is a value (`Ok(false)`), transport failures are errors
//! - Bodies are lazy `Stream`s so objects are never buffered whole
//! - No retries here; a failure is reported immediately

pub mod fs;
pub mod gcs;
pub mod memory;
pub mod mime;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::config::{StorageBackend, StorageConfig};

pub use fs::FsStore;
pub use gcs::GcsStore;
pub use memory::MemoryStore;

/// Content type reported when the backend has none for an object.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Sequential, forward-only object body.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Failures talking to the storage backend.
///
/// Messages never include credentials.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("storage request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("storage backend returned {status} during {operation}")]
    Status { status: u16, operation: &'static str },

    #[error("storage backend did not respond in time during {operation}")]
    Timeout { operation: &'static str },

    #[error("malformed storage response: {0}")]
    Decode(String),

    #[error("storage credentials unavailable: {0}")]
    Auth(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        // URLs carry bucket and key only, but keep errors terse.
        StorageError::Transport(err.without_url())
    }
}

/// Attributes of an object as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: Option<String>,
    pub size: Option<u64>,
}

/// Attributes the pipeline consumes, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub size: Option<u64>,
}

/// Read-only capability over a bucket-addressed object store.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Whether `key` exists in `bucket`. Absence is `Ok(false)`.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Metadata for an object known to exist.
    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StorageError>;

    /// Open a lazy byte stream over the object's content.
    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, StorageError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// An [`ObjectStore`] bound to the deployment's bucket.
#[derive(Debug, Clone)]
pub struct ObjectGateway {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectGateway {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.store.exists(&self.bucket, key).await
    }

    pub async fn metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let meta = self.store.metadata(&self.bucket, key).await?;
        Ok(ObjectMetadata {
            content_type: meta
                .content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            size: meta.size,
        })
    }

    pub async fn open_stream(&self, key: &str) -> Result<ByteStream, StorageError> {
        self.store.open_stream(&self.bucket, key).await
    }
}

/// Instantiate the configured backend.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let store: Arc<dyn ObjectStore> = match config.backend {
        StorageBackend::Gcs => Arc::new(GcsStore::from_config(config)?),
        StorageBackend::Filesystem => Arc::new(FsStore::new(&config.root)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

pub(crate) fn timeout(config: &StorageConfig) -> Duration {
    Duration::from_secs(config.timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_defaults_content_type() {
        let store = MemoryStore::new();
        store.insert("bucket", "site/index.html", "<html></html>", None);
        store.insert("bucket", "site/app.js", "x", Some("application/javascript"));
        store.insert("bucket", "site/blank.txt", "", Some("  "));
        let gateway = ObjectGateway::new(Arc::new(store), "bucket");

        let meta = gateway.metadata("site/index.html").await.unwrap();
        assert_eq!(meta.content_type, "text/html");
        assert_eq!(meta.size, Some(13));

        let meta = gateway.metadata("site/app.js").await.unwrap();
        assert_eq!(meta.content_type, "application/javascript");

        let meta = gateway.metadata("site/blank.txt").await.unwrap();
        assert_eq!(meta.content_type, "text/html");
    }

    #[tokio::test]
    async fn gateway_uses_its_bucket() {
        let store = MemoryStore::new();
        store.insert("other", "site/index.html", "nope", None);
        let gateway = ObjectGateway::new(Arc::new(store), "bucket");

        assert_eq!(gateway.bucket(), "bucket");
        assert!(!gateway.exists("site/index.html").await.unwrap());
    }

    #[test]
    fn builds_each_backend() {
        let mut config = StorageConfig::default();
        config.backend = StorageBackend::Memory;
        assert_eq!(build_store(&config).unwrap().name(), "memory");

        config.backend = StorageBackend::Filesystem;
        assert_eq!(build_store(&config).unwrap().name(), "filesystem");

        config.backend = StorageBackend::Gcs;
        config.auth = crate::config::AuthConfig::None;
        assert_eq!(build_store(&config).unwrap().name(), "gcs");
    }
}

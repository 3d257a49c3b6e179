//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use sitegate::config::{GatewayConfig, SiteConfig};
use sitegate::storage::{ByteStream, MemoryStore, ObjectMeta, ObjectStore, StorageError};
use sitegate::HttpServer;

pub const BUCKET: &str = "test-bucket";

/// Config mapping `site.example.com` to `site/dist` in [`BUCKET`].
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routing.sites = vec![
        SiteConfig::new("site.example.com", "site/dist"),
        SiteConfig::new("docs.example.com", "docs/build"),
    ];
    config.storage.bucket = BUCKET.to_string();
    config
}

/// How the wrapped store should misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `exists` fails as if the backend were unreachable.
    Unreachable,
    /// The body yields one chunk, then fails.
    BrokenStream,
}

/// A [`MemoryStore`] that counts every call made to it.
#[derive(Debug)]
pub struct CountingStore {
    inner: MemoryStore,
    fault: Fault,
    exists_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            fault,
            exists_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        })
    }

    pub fn put(&self, key: &str, data: &'static str, content_type: Option<&str>) {
        self.inner.insert(BUCKET, key, data, content_type);
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls()
            + self.metadata_calls.load(Ordering::SeqCst)
            + self.stream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Unreachable {
            return Err(StorageError::Auth("access denied for svc-account@secret".into()));
        }
        self.inner.exists(bucket, key).await
    }

    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StorageError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.metadata(bucket, key).await
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, StorageError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::BrokenStream {
            let chunks: Vec<Result<Bytes, StorageError>> = vec![
                Ok(Bytes::from_static(b"partial")),
                Err(StorageError::Io(std::io::Error::other("connection reset"))),
            ];
            return Ok(stream::iter(chunks).boxed());
        }
        self.inner.open_stream(bucket, key).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Server over a counting store with the standard test config.
pub fn server(store: Arc<CountingStore>) -> HttpServer {
    HttpServer::new(test_config(), store)
}

//! In-process object store.
//!
//! Holds whole objects in memory. Used by tests and for local demos with the
//! `memory` backend.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};

use super::{ByteStream, ObjectMeta, ObjectStore, StorageError};

/// Chunk size used when streaming stored bytes.
const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: Option<String>,
}

/// Object store backed by a concurrent map keyed by `(bucket, key)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<(String, String), MemoryObject>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object.
    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: Option<&str>,
    ) {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            MemoryObject {
                data: data.into(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    fn get(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(bucket, key).is_some())
    }

    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StorageError> {
        let object = self.get(bucket, key).ok_or(StorageError::NotFound)?;
        Ok(ObjectMeta {
            content_type: object.content_type,
            size: Some(object.data.len() as u64),
        })
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, StorageError> {
        let data = self.get(bucket, key).ok_or(StorageError::NotFound)?.data;
        let chunks: Vec<Result<Bytes, StorageError>> = (0..data.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    #[tokio::test]
    async fn streams_in_chunks() {
        let store = MemoryStore::new();
        let data = vec![7u8; CHUNK_SIZE * 2 + 5];
        store.insert("b", "big.bin", data.clone(), Some("application/octet-stream"));

        let chunks: Vec<Bytes> =
            store.open_stream("b", "big.bin").await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn missing_object() {
        let store = MemoryStore::new();
        assert!(!store.exists("b", "nope.js").await.unwrap());
        assert!(matches!(store.metadata("b", "nope.js").await, Err(StorageError::NotFound)));
        assert!(matches!(store.open_stream("b", "nope.js").await, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn empty_object_streams_nothing() {
        let store = MemoryStore::new();
        store.insert("b", "empty.txt", Bytes::new(), None);
        let chunks: Vec<Bytes> =
            store.open_stream("b", "empty.txt").await.unwrap().try_collect().await.unwrap();
        assert!(chunks.is_empty());
    }
}

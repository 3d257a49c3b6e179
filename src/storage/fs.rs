//! Local directory object store.
//!
//! Objects live at `<root>/<bucket>/<key>`. Useful for running the gateway
//! against a synced copy of the bucket, and for tests.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::stream::{self, StreamExt};
use tokio::io::AsyncReadExt;

use super::mime::content_type_for;
use super::{ByteStream, ObjectMeta, ObjectStore, StorageError};

const CHUNK_SIZE: usize = 64 * 1024;

/// Object store reading files beneath a root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a bucket and key to a file path, refusing anything but plain
    /// relative components.
    fn object_path(&self, bucket: &str, key: &str) -> Option<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        plain.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let Some(path) = self.object_path(bucket, key) else {
            return Ok(false);
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StorageError> {
        let path = self.object_path(bucket, key).ok_or(StorageError::NotFound)?;
        let meta = tokio::fs::metadata(&path).await.map_err(not_found_or_io)?;
        Ok(ObjectMeta {
            content_type: content_type_for(key).map(str::to_string),
            size: Some(meta.len()),
        })
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, StorageError> {
        let path = self.object_path(bucket, key).ok_or(StorageError::NotFound)?;
        let file = tokio::fs::File::open(&path).await.map_err(not_found_or_io)?;

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
            let read = file.read_buf(&mut buf).await?;
            if read == 0 {
                Ok::<_, StorageError>(None)
            } else {
                Ok(Some((buf.freeze(), file)))
            }
        });
        Ok(chunks.boxed())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

fn not_found_or_io(err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(err)
    }
}

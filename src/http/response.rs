//! Response construction for served objects.
//!
//! # Responsibilities
//! - Set `Content-Type`, `Cache-Control` and `Content-Length` before any
//!   body bytes are produced
//! - Stream the object body without buffering it
//! - Report body failures that happen after headers were flushed
//!
//! # Design Decisions
//! - A failure mid-body cannot change the status any more; the stream yields
//!   the error so hyper aborts the connection and the client sees a
//!   truncated response

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};

use crate::observability::metrics;
use crate::storage::{ByteStream, ObjectMetadata, StorageError};

/// Build the 200 response for an object.
///
/// `body` is `None` for HEAD requests.
pub fn object_response(
    metadata: &ObjectMetadata,
    cache_control: &HeaderValue,
    body: Option<Body>,
) -> Result<Response, StorageError> {
    let content_type = HeaderValue::from_str(&metadata.content_type).map_err(|_| {
        StorageError::Decode(format!("invalid content type '{}'", metadata.content_type))
    })?;

    let mut response = Response::new(body.unwrap_or_else(Body::empty));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, cache_control.clone());
    if let Some(size) = metadata.size {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    }

    Ok(response)
}

/// Wrap an object stream so a failure after headers is logged and counted.
pub fn monitor_stream(
    stream: ByteStream,
    key: String,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, StorageError>> + Send + 'static {
    stream.inspect_err(move |err| {
        metrics::record_stream_failure();
        tracing::error!(
            request_id = %request_id,
            key = %key,
            error = %err,
            "Object stream failed after headers were sent; terminating response"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};

    fn metadata(content_type: &str, size: Option<u64>) -> ObjectMetadata {
        ObjectMetadata {
            content_type: content_type.to_string(),
            size,
        }
    }

    #[test]
    fn sets_headers() {
        let cache = HeaderValue::from_static("public, max-age=3600");
        let response =
            object_response(&metadata("application/javascript", Some(42)), &cache, None).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=3600");
        assert_eq!(response.headers()[CONTENT_LENGTH], "42");
    }

    #[test]
    fn unknown_size_omits_length() {
        let cache = HeaderValue::from_static("no-cache");
        let response = object_response(&metadata("text/html", None), &cache, None).unwrap();
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn rejects_unrepresentable_content_type() {
        let cache = HeaderValue::from_static("no-cache");
        let result = object_response(&metadata("text/html\n", None), &cache, None);
        assert!(matches!(result, Err(StorageError::Decode(_))));
    }

    #[tokio::test]
    async fn monitored_stream_passes_errors_through() {
        let inner: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::Io(std::io::Error::other("reset"))),
        ])
        .boxed();

        let items: Vec<_> = monitor_stream(inner, "site/app.js".into(), "req-1".into())
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}

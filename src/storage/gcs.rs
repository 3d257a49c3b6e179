//! Google Cloud Storage backend.
//!
//! # Responsibilities
//! - Check and fetch objects through the GCS JSON API
//! - Obtain OAuth access tokens (none, environment, metadata server)
//! - Expose media downloads as lazy byte streams
//!
//! # Design Decisions
//! - One shared `reqwest::Client` (connection pooling across requests)
//! - Every call is bounded by the storage timeout. Metadata calls bound the
//!   whole request; media downloads bound the wait for headers and each
//!   body read, so large objects are not cut off while bytes keep flowing
//! - Tokens are cached until shortly before expiry and never logged. The
//!   cache lock is never held across a network call
//! - Objects stored with a `Content-Encoding` are transcoded by GCS when the
//!   client does not accept that encoding, so their stored size is not
//!   reported as the response length

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{timeout, ByteStream, ObjectMeta, ObjectStore, StorageError};
use crate::config::{AuthConfig, StorageConfig};

/// GCE metadata server endpoint for the default service account token.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh tokens this long before the server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where access tokens come from.
pub enum TokenProvider {
    Anonymous,
    Static(String),
    MetadataServer {
        url: String,
        cached: Mutex<Option<CachedToken>>,
    },
}

pub struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenProvider::Anonymous => f.write_str("Anonymous"),
            TokenProvider::Static(_) => f.write_str("Static(<redacted>)"),
            TokenProvider::MetadataServer { url, .. } => {
                f.debug_struct("MetadataServer").field("url", url).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl TokenProvider {
    pub fn metadata_server(url: impl Into<String>) -> Self {
        TokenProvider::MetadataServer {
            url: url.into(),
            cached: Mutex::new(None),
        }
    }

    fn from_config(auth: &AuthConfig) -> Result<Self, StorageError> {
        match auth {
            AuthConfig::None => Ok(TokenProvider::Anonymous),
            AuthConfig::MetadataServer => Ok(Self::metadata_server(METADATA_TOKEN_URL)),
            AuthConfig::Env { var } => std::env::var(var)
                .ok()
                .filter(|token| !token.trim().is_empty())
                .map(|token| TokenProvider::Static(token.trim().to_string()))
                .ok_or_else(|| {
                    StorageError::Auth(format!("environment variable {var} is not set"))
                }),
        }
    }

    async fn token(
        &self,
        client: &Client,
        request_timeout: Duration,
    ) -> Result<Option<String>, StorageError> {
        match self {
            TokenProvider::Anonymous => Ok(None),
            TokenProvider::Static(token) => Ok(Some(token.clone())),
            TokenProvider::MetadataServer { url, cached } => {
                if let Some(token) = cached
                    .lock()
                    .await
                    .as_ref()
                    .filter(|t| Instant::now() < t.refresh_at)
                {
                    return Ok(Some(token.value.clone()));
                }

                // Concurrent refreshes may race; the last one to finish wins.
                let fetched = fetch_metadata_token(client, url, request_timeout).await?;
                let value = fetched.value.clone();
                *cached.lock().await = Some(fetched);
                Ok(Some(value))
            }
        }
    }
}

async fn fetch_metadata_token(
    client: &Client,
    url: &str,
    request_timeout: Duration,
) -> Result<CachedToken, StorageError> {
    let auth_error = |e: reqwest::Error| StorageError::Auth(e.without_url().to_string());

    let response = client
        .get(url)
        .header("Metadata-Flavor", "Google")
        .timeout(request_timeout)
        .send()
        .await
        .map_err(auth_error)?;
    if !response.status().is_success() {
        return Err(StorageError::Auth(format!(
            "metadata server returned {}",
            response.status().as_u16()
        )));
    }
    let body: TokenResponse = response.json().await.map_err(auth_error)?;

    let lifetime =
        Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
    tracing::debug!(expires_in = body.expires_in, "Fetched storage access token");
    Ok(CachedToken {
        value: body.access_token,
        refresh_at: Instant::now() + lifetime,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    content_type: Option<String>,
    content_encoding: Option<String>,
    // The JSON API encodes uint64 as a string.
    size: Option<String>,
}

impl ObjectResource {
    /// Whether GCS will serve bytes different from the stored ones.
    fn is_transcoded(&self) -> bool {
        self.content_encoding
            .as_deref()
            .is_some_and(|encoding| !encoding.trim().eq_ignore_ascii_case("identity"))
    }
}

/// Object store talking to the GCS JSON API.
#[derive(Debug)]
pub struct GcsStore {
    client: Client,
    endpoint: String,
    tokens: TokenProvider,
    request_timeout: Duration,
}

impl GcsStore {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: TokenProvider,
        request_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .read_timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            tokens,
            request_timeout,
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let tokens = TokenProvider::from_config(&config.auth)?;
        Self::new(&config.endpoint, tokens, timeout(config))
    }

    /// JSON API URL of an object resource.
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }

    async fn get(&self, url: &str) -> Result<RequestBuilder, StorageError> {
        let mut request = self.client.get(url);
        if let Some(token) = self.tokens.token(&self.client, self.request_timeout).await? {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let url = self.object_url(bucket, key);
        let response = self
            .get(&url)
            .await?
            .query(&[("fields", "name")])
            .timeout(self.request_timeout)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::Status {
                status: status.as_u16(),
                operation: "exists",
            }),
        }
    }

    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMeta, StorageError> {
        let url = self.object_url(bucket, key);
        let response = self
            .get(&url)
            .await?
            .query(&[("fields", "contentType,contentEncoding,size")])
            .timeout(self.request_timeout)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound),
            status => {
                return Err(StorageError::Status {
                    status: status.as_u16(),
                    operation: "metadata",
                })
            }
        }

        let resource: ObjectResource = response
            .json()
            .await
            .map_err(|e| StorageError::Decode(e.without_url().to_string()))?;
        let size = resource
            .size
            .as_deref()
            .map(str::parse::<u64>)
            .transpose()
            .map_err(|e| StorageError::Decode(format!("size: {e}")))?
            .filter(|_| !resource.is_transcoded());

        Ok(ObjectMeta {
            content_type: resource.content_type,
            size,
        })
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, StorageError> {
        let url = self.object_url(bucket, key);
        let request = self.get(&url).await?.query(&[("alt", "media")]);
        let response = tokio::time::timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| StorageError::Timeout {
                operation: "download",
            })??;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound),
            status => {
                return Err(StorageError::Status {
                    status: status.as_u16(),
                    operation: "download",
                })
            }
        }

        Ok(response.bytes_stream().map_err(StorageError::from).boxed())
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use axum::http::header::{HeaderValue, InvalidHeaderValue};
use serde::{Deserialize, Serialize};

/// Bucket used when neither the config file nor `BUCKET_NAME` names one.
pub const DEFAULT_BUCKET: &str = "deccan-annotation-dev";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Host-to-prefix mapping and resolution policy.
    pub routing: RoutingConfig,

    /// Object-storage backend settings.
    pub storage: StorageConfig,

    /// Response caching headers.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Liveness endpoint.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Which request header wins when deciding the effective hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HostTrust {
    /// Prefer `X-Forwarded-Host` (set by the load balancer) over `Host`.
    #[default]
    ForwardedFirst,
    /// Only ever consult `Host`.
    HostOnly,
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Version tag of the mapping artifact, logged at startup.
    pub version: String,

    /// Forwarded-host trust policy.
    pub host_trust: HostTrust,

    /// Entry document served for extension-less paths.
    pub index_document: String,

    /// Site definitions mapping hostnames to bucket prefixes.
    pub sites: Vec<SiteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            version: "builtin".to_string(),
            host_trust: HostTrust::default(),
            index_document: "index.html".to_string(),
            sites: vec![
                SiteConfig::new("annotation-admin.delta.soulhq.ai", "annotation-admin-dev/dist"),
                SiteConfig::new("nucleus.delta.soulhq.ai", "nucleus/storybook-static"),
                SiteConfig::new("authentication.delta.soulhq.ai", "authentication/dist"),
            ],
        }
    }
}

/// A single hosted site.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Hostname to match (exact, case-insensitive).
    pub hostname: String,

    /// Object-key prefix holding the site's build output.
    pub prefix: String,
}

impl SiteConfig {
    pub fn new(hostname: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            prefix: prefix.into(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Google Cloud Storage JSON API.
    #[default]
    Gcs,
    /// Local directory, one subdirectory per bucket.
    Filesystem,
    /// In-process map (empty at startup).
    Memory,
}

/// How the GCS backend obtains an OAuth access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// Anonymous access (public buckets, local emulators).
    None,
    /// Fetch tokens from the GCE metadata server.
    #[default]
    MetadataServer,
    /// Read a static token from an environment variable at startup.
    Env { var: String },
}

/// Object-storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend implementation.
    pub backend: StorageBackend,

    /// Bucket holding every site's artifacts.
    pub bucket: String,

    /// GCS API endpoint.
    pub endpoint: String,

    /// GCS credentials source.
    pub auth: AuthConfig,

    /// Root directory for the filesystem backend.
    pub root: String,

    /// Timeout for a single storage call in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: DEFAULT_BUCKET.to_string(),
            endpoint: "https://storage.googleapis.com".to_string(),
            auth: AuthConfig::default(),
            root: "./data".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Caching headers attached to successful responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub cache_control: String,
}

/// `Cache-Control` value sent with every served object by default.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=3600";

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_control: DEFAULT_CACHE_CONTROL.to_string(),
        }
    }
}

impl CacheConfig {
    /// The configured value as a header.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.cache_control)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to produce response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Liveness endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Path answered with 200 regardless of host.
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/healthz".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_builtin_sites() {
        let config = GatewayConfig::default();
        assert_eq!(config.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(config.routing.sites.len(), 3);
        assert_eq!(config.cache.cache_control, "public, max-age=3600");
        assert_eq!(config.routing.host_trust, HostTrust::ForwardedFirst);
    }

    #[test]
    fn parses_minimal_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [routing]
            host_trust = "host-only"

            [[routing.sites]]
            hostname = "site.example.com"
            prefix = "site/dist"

            [storage]
            backend = "filesystem"
            root = "/srv/sites"

            [storage.auth]
            kind = "env"
            var = "GCS_ACCESS_TOKEN"
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.host_trust, HostTrust::HostOnly);
        assert_eq!(config.routing.sites, vec![SiteConfig::new("site.example.com", "site/dist")]);
        assert_eq!(config.routing.index_document, "index.html");
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert_eq!(
            config.storage.auth,
            AuthConfig::Env { var: "GCS_ACCESS_TOKEN".into() }
        );
        assert_eq!(config.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}

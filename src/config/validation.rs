//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject route entries that could build malformed object keys
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate hostnames
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::host::normalize_host;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("site #{index} has an empty hostname")]
    EmptyHostname { index: usize },

    #[error("hostname '{hostname}' must not contain a port or path")]
    MalformedHostname { hostname: String },

    #[error("hostname '{hostname}' is mapped more than once")]
    DuplicateHostname { hostname: String },

    #[error("prefix '{prefix}' for '{hostname}' must not start with '/'")]
    AbsolutePrefix { hostname: String, prefix: String },

    #[error("prefix '{prefix}' for '{hostname}' contains a '..' segment")]
    TraversalPrefix { hostname: String, prefix: String },

    #[error("index document '{0}' must be a bare file name")]
    InvalidIndexDocument(String),

    #[error("storage bucket must not be empty")]
    EmptyBucket,

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("health path '{0}' must be a fixed path other than '/'")]
    InvalidHealthPath(String),

    #[error("cache-control '{0}' is not a valid header value")]
    InvalidCacheControl(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, site) in config.routing.sites.iter().enumerate() {
        let raw = site.hostname.trim();
        if raw.is_empty() {
            errors.push(ValidationError::EmptyHostname { index });
            continue;
        }
        if raw.contains(':') || raw.contains('/') {
            errors.push(ValidationError::MalformedHostname {
                hostname: site.hostname.clone(),
            });
        }
        let hostname = normalize_host(raw);
        if !seen.insert(hostname.clone()) {
            errors.push(ValidationError::DuplicateHostname { hostname });
        }

        if site.prefix.starts_with('/') {
            errors.push(ValidationError::AbsolutePrefix {
                hostname: site.hostname.clone(),
                prefix: site.prefix.clone(),
            });
        }
        if site.prefix.split('/').any(|segment| segment == "..") {
            errors.push(ValidationError::TraversalPrefix {
                hostname: site.hostname.clone(),
                prefix: site.prefix.clone(),
            });
        }
    }

    let index = &config.routing.index_document;
    if index.is_empty() || index.contains('/') || index == ".." {
        errors.push(ValidationError::InvalidIndexDocument(index.clone()));
    }

    if config.storage.bucket.trim().is_empty() {
        errors.push(ValidationError::EmptyBucket);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("timeouts.request_secs"));
    }
    if config.storage.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("storage.timeout_secs"));
    }

    let health = &config.health.path;
    if !health.starts_with('/')
        || health == "/"
        || health.contains(['{', '}', '*'])
        || health.split('/').any(|segment| segment.starts_with(':'))
    {
        errors.push(ValidationError::InvalidHealthPath(config.health.path.clone()));
    }

    if config.cache.header_value().is_err() {
        errors.push(ValidationError::InvalidCacheControl(config.cache.cache_control.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SiteConfig;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = GatewayConfig::default();
        config.routing.sites = vec![
            SiteConfig::new("Site.Example.com", "site/dist"),
            SiteConfig::new("site.example.com", "/abs"),
            SiteConfig::new("", "empty"),
            SiteConfig::new("evil.example.com", "a/../b"),
        ];
        config.storage.bucket = String::new();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateHostname {
                    hostname: "site.example.com".into()
                },
                ValidationError::AbsolutePrefix {
                    hostname: "site.example.com".into(),
                    prefix: "/abs".into()
                },
                ValidationError::EmptyHostname { index: 2 },
                ValidationError::TraversalPrefix {
                    hostname: "evil.example.com".into(),
                    prefix: "a/../b".into()
                },
                ValidationError::EmptyBucket,
                ValidationError::ZeroTimeout("timeouts.request_secs"),
            ]
        );
    }

    #[test]
    fn rejects_hostname_with_port() {
        let mut config = GatewayConfig::default();
        config.routing.sites = vec![SiteConfig::new("site.example.com:8080", "site")];
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::MalformedHostname { .. }));
    }

    #[test]
    fn health_path_must_not_shadow_sites() {
        for path in ["healthz", "/", "/{*rest}", "/:status", "/status/:id"] {
            let mut config = GatewayConfig::default();
            config.health.path = path.into();
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::InvalidHealthPath(path.into())])
            );
        }
    }

    #[test]
    fn rejects_unrepresentable_cache_control() {
        let mut config = GatewayConfig::default();
        config.cache.cache_control = "public,\nmax-age=60".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidCacheControl("public,\nmax-age=60".into())])
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}

//! Effective hostname extraction.
//!
//! # Responsibilities
//! - Pick the header that names the requested site (trust policy)
//! - Normalize it to a lookup key (lowercase, port stripped)
//!
//! # Design Decisions
//! - Pure and infallible: an unusable header yields an empty host, which the
//!   route table treats as a miss
//! - Host matching is case-insensitive

use axum::http::header::{HeaderMap, HOST};
use axum::http::HeaderName;

use crate::config::HostTrust;

/// Header set by the upstream load balancer with the client-facing host.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Resolves the effective hostname of a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostResolver {
    trust: HostTrust,
}

impl HostResolver {
    pub fn new(trust: HostTrust) -> Self {
        Self { trust }
    }

    pub fn trust(&self) -> HostTrust {
        self.trust
    }

    /// Produce the normalized hostname for a set of request headers.
    pub fn resolve(&self, headers: &HeaderMap) -> String {
        let forwarded = match self.trust {
            HostTrust::ForwardedFirst => header_str(headers, &X_FORWARDED_HOST)
                // A chain of proxies appends; the first entry is the client's.
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty()),
            HostTrust::HostOnly => None,
        };

        forwarded
            .or_else(|| header_str(headers, &HOST))
            .map(normalize_host)
            .unwrap_or_default()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Lowercase a host and drop anything from the first `:` onward.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host.split_once(':').map_or(host, |(name, _port)| name);
    host.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_host("Site.Example.COM"), "site.example.com");
        assert_eq!(normalize_host("site.example.com:8080"), "site.example.com");
        assert_eq!(normalize_host(" site.example.com "), "site.example.com");
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn test_forwarded_host_wins() {
        let resolver = HostResolver::new(HostTrust::ForwardedFirst);
        let map = headers(&[
            ("host", "internal-lb:8080"),
            ("x-forwarded-host", "Site.Example.com"),
        ]);
        assert_eq!(resolver.resolve(&map), "site.example.com");
    }

    #[test]
    fn test_forwarded_chain_uses_first_entry() {
        let resolver = HostResolver::new(HostTrust::ForwardedFirst);
        let map = headers(&[("x-forwarded-host", "site.example.com:443, edge.internal")]);
        assert_eq!(resolver.resolve(&map), "site.example.com");
    }

    #[test]
    fn test_host_only_ignores_forwarded() {
        let resolver = HostResolver::new(HostTrust::HostOnly);
        let map = headers(&[
            ("host", "site.example.com"),
            ("x-forwarded-host", "attacker.example.com"),
        ]);
        assert_eq!(resolver.resolve(&map), "site.example.com");
    }

    #[test]
    fn test_falls_back_to_host() {
        let resolver = HostResolver::default();
        assert_eq!(
            resolver.resolve(&headers(&[("host", "SITE.example.com:80")])),
            "site.example.com"
        );
        assert_eq!(
            resolver.resolve(&headers(&[("host", "site.example.com"), ("x-forwarded-host", " ")])),
            "site.example.com"
        );
    }

    #[test]
    fn test_missing_headers_yield_empty() {
        let resolver = HostResolver::default();
        assert_eq!(resolver.resolve(&HeaderMap::new()), "");

        let mut map = HeaderMap::new();
        map.insert(HOST, HeaderValue::from_bytes(b"caf\xe9").unwrap());
        assert_eq!(resolver.resolve(&map), "");
    }
}

//! Hostname to storage prefix lookup.
//!
//! # Responsibilities
//! - Store the configured site mapping
//! - Look up the prefix for a normalized hostname
//! - Return the prefix or an explicit miss
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap
//! - Exact match only; no wildcards

use std::collections::HashMap;

use crate::config::{RoutingConfig, SiteConfig};
use crate::routing::host::normalize_host;

/// Immutable hostname → prefix mapping.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    version: String,
    routes: HashMap<String, String>,
}

impl RouteTable {
    /// Build the table from validated routing configuration.
    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::from_sites(config.version.clone(), &config.sites)
    }

    pub fn from_sites(version: impl Into<String>, sites: &[SiteConfig]) -> Self {
        let routes = sites
            .iter()
            .map(|site| {
                (
                    normalize_host(&site.hostname),
                    site.prefix.trim_end_matches('/').to_string(),
                )
            })
            .collect();

        Self {
            version: version.into(),
            routes,
        }
    }

    /// Look up the prefix for an already-normalized hostname.
    pub fn lookup(&self, hostname: &str) -> Option<&str> {
        if hostname.is_empty() {
            return None;
        }
        self.routes.get(hostname).map(String::as_str)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Entries sorted by hostname, for display.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .routes
            .iter()
            .map(|(host, prefix)| (host.as_str(), prefix.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::from_sites(
            "test",
            &[
                SiteConfig::new("Site.Example.com", "site/dist/"),
                SiteConfig::new("docs.example.com", "docs"),
            ],
        )
    }

    #[test]
    fn test_exact_lookup() {
        let table = table();
        assert_eq!(table.lookup("site.example.com"), Some("site/dist"));
        assert_eq!(table.lookup("docs.example.com"), Some("docs"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_misses() {
        let table = table();
        assert_eq!(table.lookup(""), None);
        assert_eq!(table.lookup("unknown.example.com"), None);
        assert_eq!(table.lookup("example.com"), None);
        assert_eq!(table.lookup("www.site.example.com"), None);
    }

    #[test]
    fn test_entries_sorted() {
        assert_eq!(
            table().entries(),
            vec![("docs.example.com", "docs"), ("site.example.com", "site/dist")]
        );
    }
}

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (headers, path)
//!     → host.rs (effective hostname under the trust policy)
//!     → table.rs (hostname → prefix, or miss)
//!     → path.rs (prefix + path → object key, SPA fallback)
//!     → Return: ResolvedRequest, miss, or rejected path
//!
//! Table Compilation (at startup):
//!     SiteConfig[]
//!     → Normalize hostnames, trim prefixes
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact host match only, no wildcards
//! - Deterministic: same input always resolves to the same key

pub mod host;
pub mod path;
pub mod table;

pub use host::{normalize_host, HostResolver};
pub use path::{PathError, PathResolver, ResolvedRequest};
pub use table::RouteTable;

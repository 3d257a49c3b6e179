//! Multi-tenant static site gateway library.
//!
//! Resolves a site from the request's host, maps it to a prefix in a shared
//! object-storage bucket and streams the matching object back, falling back
//! to the site's entry document for client-side routes.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod storage;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID assigned and propagated)
//!     → pipeline.rs (host → route → key → storage)
//!     → response.rs (headers, streamed body) or error.rs (404/400/500)
//!     → Send to client
//! ```

pub mod error;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use error::GatewayError;
pub use pipeline::RequestPipeline;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;

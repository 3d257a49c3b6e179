//! Object key construction.
//!
//! # Responsibilities
//! - Decide between the requested file and the SPA entry document
//! - Join prefix and path into a storage object key
//! - Reject paths that could escape the site's prefix
//!
//! # Design Decisions
//! - A path whose last segment has no `.` is a client-side route: the
//!   sub-path is discarded and the index document is served
//! - Joining is plain concatenation with exactly one `/`; no normalization
//! - Any `..` segment is rejected outright, even when the fallback would
//!   discard it

use std::borrow::Cow;

/// Why a request path was refused before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path contains a parent-directory segment")]
    Traversal,

    #[error("path contains a forbidden character")]
    ForbiddenCharacter,

    #[error("path is not valid UTF-8 after decoding")]
    InvalidEncoding,
}

/// Per-request routing outcome, dropped once the response is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub hostname: String,
    pub raw_path: String,
    pub prefix: String,
    pub has_extension: bool,
    pub object_key: String,
}

/// Builds object keys from a site prefix and a request path.
#[derive(Debug, Clone)]
pub struct PathResolver {
    index_document: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new("index.html")
    }
}

impl PathResolver {
    pub fn new(index_document: impl Into<String>) -> Self {
        Self {
            index_document: index_document.into(),
        }
    }

    pub fn index_document(&self) -> &str {
        &self.index_document
    }

    /// Resolve `raw_path` (as received, percent-encoded) under `prefix`.
    pub fn resolve(
        &self,
        hostname: &str,
        prefix: &str,
        raw_path: &str,
    ) -> Result<ResolvedRequest, PathError> {
        let decoded = decode_path(raw_path)?;
        let has_extension = has_extension(&decoded);

        let relative = if has_extension {
            decoded.trim_start_matches('/')
        } else {
            self.index_document.as_str()
        };

        Ok(ResolvedRequest {
            hostname: hostname.to_string(),
            raw_path: raw_path.to_string(),
            prefix: prefix.to_string(),
            has_extension,
            object_key: join_key(prefix, relative),
        })
    }
}

/// True when the final path segment contains a `.`.
pub fn has_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    last.contains('.')
}

fn decode_path(raw_path: &str) -> Result<Cow<'_, str>, PathError> {
    let decoded = urlencoding::decode(raw_path).map_err(|_| PathError::InvalidEncoding)?;

    if decoded.contains('\0') || decoded.contains('\\') {
        return Err(PathError::ForbiddenCharacter);
    }
    if decoded.split('/').any(|segment| segment == "..") {
        return Err(PathError::Traversal);
    }

    Ok(decoded)
}

fn join_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}

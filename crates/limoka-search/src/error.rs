//! Error types for the search, navigation and install layers.

use thiserror::Error;

/// Failure of an outbound HTTP request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The request did not complete within its timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Connection, TLS or protocol failure.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        message: String,
    },

    /// Client construction failed.
    #[error("http client error: {0}")]
    Client(String),
}

/// Failure to fetch or ingest the catalog manifest.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The manifest could not be downloaded.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The manifest is not valid JSON.
    #[error("manifest is not valid JSON: {0}")]
    Parse(String),

    /// The manifest's top level is not an object keyed by path.
    #[error("manifest must be a JSON object keyed by module path")]
    NotAnObject,
}

/// Failure to load or persist the index snapshot.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Filesystem error.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be (de)serialized.
    #[error("index serialization error: {0}")]
    Serialization(String),

    /// The persisted snapshot was written by an incompatible version.
    #[error("index format version {found} is not supported (expected {expected})")]
    UnsupportedVersion {
        /// Version found on disk.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// A blocking persistence task panicked or was cancelled.
    #[error("index persistence task failed: {0}")]
    Task(String),
}

/// A query the parser cannot interpret.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// A double quote was opened but never closed.
    #[error("unbalanced double quote in query")]
    UnbalancedQuote,
}

/// A control payload that cannot be acted upon.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavError {
    /// The payload is not in the expected format.
    #[error("malformed control payload: {0}")]
    Malformed(String),

    /// The payload refers to a catalog snapshot that has been replaced.
    #[error("control payload refers to catalog {found}, live catalog is {live}")]
    Expired {
        /// Fingerprint carried by the payload.
        found: String,
        /// Fingerprint of the live snapshot.
        live: String,
    },
}

/// Failure reported by the plugin loader.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The module path cannot be mapped to a safe location.
    #[error("invalid module path: {0}")]
    InvalidPath(String),

    /// Writing the plugin failed.
    #[error("loader I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The loader refused the plugin.
    #[error("plugin rejected: {0}")]
    Rejected(String),
}

/// A signed install directive that cannot be honoured.
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// The tag is not `path:signature` with a 128-character hex signature.
    #[error("invalid directive format")]
    InvalidFormat,

    /// No catalog entry matches the directive path.
    #[error("module not found in catalog: {0}")]
    ModuleNotFound(String),

    /// The plugin bytes could not be downloaded.
    #[error("download failed: {0}")]
    Download(#[from] HttpError),

    /// The signature does not cover this path and content.
    #[error("signature verification failed for {path}")]
    SignatureInvalid {
        /// Resolved module path.
        path: String,
    },

    /// The chat transport failed.
    #[error("chat transport error: {0}")]
    Chat(String),
}

/// Top-level error of the search service.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Catalog fetch or ingestion failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Index persistence failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Per-user state could not be read or written.
    #[error(transparent)]
    Storage(#[from] limoka_storage::StorageError),

    /// Plugin loader failure.
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Result type for service operations.
pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display() {
        let err = HttpError::Status {
            url: "https://x/modules.json".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "request to https://x/modules.json returned HTTP 404"
        );
    }

    #[test]
    fn catalog_error_wraps_http_transparently() {
        let err: CatalogError = HttpError::Timeout {
            url: "https://x".into(),
        }
        .into();
        assert_eq!(err.to_string(), "request to https://x timed out");
    }

    #[test]
    fn search_error_from_index() {
        let err: SearchError = IndexError::UnsupportedVersion {
            found: 9,
            expected: 1,
        }
        .into();
        assert!(err.to_string().contains("version 9"));
    }
}

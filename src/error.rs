//! Error types for the fetch engine
//!
//! Only hard failures surface here. Rate limits, transient network trouble
//! and permanent per-URL HTTP errors are absorbed by the retry loop and never
//! reach the caller as an `Error`.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the fetch engine
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Request Errors
    // ============================================================================
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response body of {url:?}: {message}")]
    Decode { url: String, message: String },

    // ============================================================================
    // Cache Errors
    // ============================================================================
    #[error("Response cache {operation} failed for {}: {source}", path.display())]
    CacheIo {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a decode error for the given URL
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a cache I/O error
    pub fn cache_io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::CacheIo {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether this error signals systemic storage trouble
    pub fn is_cache_failure(&self) -> bool {
        matches!(self, Error::CacheIo { .. })
    }
}

/// Result type alias for the fetch engine
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for turning lower-level failures into config errors
pub trait ResultExt<T> {
    /// Wrap the error as [`Error::Config`], prefixed by a lazily built message
    fn config_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn config_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::config(format!("{}: {}", f(), e.into())))
    }
}

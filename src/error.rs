// src/error.rs

//! Unified error handling for the catalog scraper.
//!
//! Two layers:
//! - [`FetchError`]: per-item acquisition failures. Callers count and skip them.
//! - [`AppError`]: everything else. Only catalog and configuration errors are
//!   fatal to a run.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure while fetching a page or an image.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Remote answered 404
    #[error("not found")]
    NotFound,

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Any other non-success status
    #[error("HTTP status {0}")]
    Http(u16),

    /// Connection, TLS or body read failure
    #[error("network error: {0}")]
    Network(String),

    /// Payload is not a usable image
    #[error("decode error: {0}")]
    Decode(String),

    /// Destination could not be written
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Http(status) => *status >= 500 || *status == 429,
            FetchError::NotFound | FetchError::Decode(_) | FetchError::Write(_) => false,
        }
    }

    /// Short label used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound => "not_found",
            FetchError::Timeout => "timeout",
            FetchError::Http(_) => "http",
            FetchError::Network(_) => "network",
            FetchError::Decode(_) => "decode",
            FetchError::Write(_) => "write",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout;
        }
        match e.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => FetchError::NotFound,
            Some(status) => FetchError::Http(status.as_u16()),
            None => FetchError::Network(e.to_string()),
        }
    }
}

impl From<image::ImageError> for FetchError {
    fn from(e: image::ImageError) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catalog file is missing or not valid JSON
    #[error("Catalog unavailable at {}: {reason}", path.display())]
    CatalogUnavailable { path: PathBuf, reason: String },

    /// Catalog file could not be written
    #[error("Catalog I/O error at {}: {source}", path.display())]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Merge refused because both sides disagree on a key
    #[error("Conflicting values for '{key}': '{existing}' vs '{incoming}'")]
    DuplicateKeyConflict {
        key: String,
        existing: String,
        incoming: String,
    },

    /// Too many consecutive item failures
    #[error(
        "Circuit breaker triggered after {consecutive_failures} consecutive failures (threshold {threshold})"
    )]
    CircuitBreakerTriggered {
        consecutive_failures: usize,
        threshold: usize,
    },

    /// Detail page had no recognizable image
    #[error("No image found for {0}")]
    NoImageFound(String),

    /// Page or image fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a catalog-unavailable error.
    pub fn catalog_unavailable(path: &Path, reason: impl fmt::Display) -> Self {
        Self::CatalogUnavailable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Create a catalog write error.
    pub fn catalog_io(path: &Path, source: std::io::Error) -> Self {
        Self::CatalogIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::CatalogUnavailable { .. }
                | AppError::CatalogIo { .. }
                | AppError::Config(_)
                | AppError::Toml(_)
        )
    }
}

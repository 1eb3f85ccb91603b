//! Error types for the download module.
//!
//! This module defines structured errors for all fetch and persist
//! operations, providing context-rich error messages for debugging and user
//! feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching platform resources or persisting media.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present.
        retry_after: Option<String>,
    },

    /// File system error while creating or writing a destination file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response body failed after streaming had started.
    ///
    /// The destination file is left partially written.
    #[error("transport error streaming {url} into {path}: {source}")]
    Transport {
        /// The media URL being streamed.
        url: String,
        /// The partially written destination.
        path: PathBuf,
        /// The underlying body read error.
        #[source]
        source: reqwest::Error,
    },

    /// Every attempt failed; wraps the last failure.
    #[error("giving up on {url} after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The final attempt's failure.
        #[source]
        source: Box<DownloadError>,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a mid-stream transport error.
    pub fn transport(url: impl Into<String>, path: impl Into<PathBuf>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            path: path.into(),
            source,
        }
    }

    /// Wraps the final failure after the attempt budget is spent.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, last: DownloadError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns the innermost error, unwrapping [`DownloadError::RetriesExhausted`].
    #[must_use]
    pub fn last_failure(&self) -> &DownloadError {
        match self {
            Self::RetriesExhausted { source, .. } => source.last_failure(),
            other => other,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// URL or path, which the source errors do not carry.

//! HTTP client wrapper for platform API and media requests.
//!
//! This module provides the [`HttpClient`] struct which owns a pooled
//! `reqwest` client configured with the timeouts appropriate to its role and
//! maps transport outcomes into [`DownloadError`].

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;
use crate::config::DownloaderConfig;

/// HTTP client for platform requests.
///
/// This client is designed to be created once and reused for multiple
/// requests, taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client for metadata and playback-info calls.
    ///
    /// Applies the connect timeout and a fixed total request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend cannot be initialized.
    pub fn for_api(config: &DownloaderConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Creates a client for streaming media bodies.
    ///
    /// No total timeout is applied, since a long transfer is legitimate; the
    /// optional read timeout bounds a stalled stream instead.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend cannot be initialized.
    pub fn for_media(config: &DownloaderConfig) -> Result<Self, DownloadError> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(read_timeout) = config.media_read_timeout {
            builder = builder.read_timeout(read_timeout);
        }
        let client = builder
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends a single GET and fails on any non-success status.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    #[instrument(level = "debug", skip(self, headers), fields(url = %url))]
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(DownloadError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        debug!(status = status.as_u16(), "request succeeded");
        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

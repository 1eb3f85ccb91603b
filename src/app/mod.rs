//! High-level entry point: reference string in, files on disk out.
//!
//! [`Downloader`] wires the resolver and the batch orchestrator to one
//! [`DownloaderConfig`]. The binary is a thin shell around it.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::batch::{BatchError, BatchEvent, BatchJob, BatchOrchestrator, BatchReport, DownloadMode};
use crate::config::{ConfigError, DownloaderConfig};
use crate::download::DownloadError;
use crate::headers::{BrowserHeaderProvider, HeaderProvider};
use crate::media::MediaItem;
use crate::merge::{FfmpegMuxer, Muxer};
use crate::parser::{ItemReference, ParseError};
use crate::resolver::{MetadataResolver, ResolveError};

/// Top-level error of a download invocation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration rejected before anything ran.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The reference string could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Items could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The batch failed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// An HTTP client could not be built.
    #[error("failed to initialize HTTP client: {0}")]
    Client(#[from] DownloadError),
}

/// One user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Raw reference, e.g. `BV1xx411c7mD` or `BV1xx411c7mD_p2`.
    pub reference: String,
    /// Directory receiving the final artifacts.
    pub target_dir: PathBuf,
    /// Streams to fetch.
    pub mode: DownloadMode,
    /// Download every sub-unit of the reference's video.
    pub list: bool,
}

/// Resolves references and runs batches with one shared configuration.
#[derive(Debug)]
pub struct Downloader {
    resolver: MetadataResolver,
    orchestrator: BatchOrchestrator,
}

impl Downloader {
    /// Creates a downloader with browser-like headers and `ffmpeg` as multiplexer.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if `config` is invalid and
    /// [`AppError::Client`] if an HTTP client cannot be built.
    pub fn new(config: &DownloaderConfig) -> Result<Self, AppError> {
        config.validate()?;
        let headers = Arc::new(BrowserHeaderProvider::from_config(config)?);
        let muxer = Arc::new(FfmpegMuxer::from_config(config));
        Self::with_components(config, headers, muxer)
    }

    /// Creates a downloader with injected collaborators.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_components(
        config: &DownloaderConfig,
        headers: Arc<dyn HeaderProvider>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let resolver = MetadataResolver::new(config, Arc::clone(&headers))?;
        let orchestrator = BatchOrchestrator::new(config, headers, muxer)?;
        Ok(Self {
            resolver,
            orchestrator,
        })
    }

    /// Forwards batch progress to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.orchestrator = self.orchestrator.with_events(sender);
        self
    }

    /// Resolves `reference` into items.
    ///
    /// With `list`, every sub-unit of the video is returned and any sub-index
    /// in the reference is ignored. Otherwise exactly one item is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Parse`] or [`AppError::Resolve`].
    #[instrument(skip(self))]
    pub async fn resolve(&self, reference: &str, list: bool) -> Result<Vec<MediaItem>, AppError> {
        let reference = ItemReference::parse(reference)?;

        let items = if list {
            if let Some(sub_index) = reference.sub_index() {
                warn!(sub_index, "sub-index ignored when downloading every sub-unit");
            }
            self.resolver
                .resolve_all_sub_units(reference.base_id())
                .await?
        } else {
            self.resolver
                .resolve_batch(std::slice::from_ref(&reference))
                .await?
        };
        Ok(items)
    }

    /// Downloads already-resolved `items`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Batch`].
    pub async fn download(
        &self,
        items: Vec<MediaItem>,
        target_dir: impl Into<PathBuf>,
        mode: DownloadMode,
    ) -> Result<BatchReport, AppError> {
        let job = BatchJob::new(items, target_dir, mode);
        Ok(self.orchestrator.run(&job).await?)
    }

    /// Resolves and downloads one request.
    ///
    /// # Errors
    ///
    /// Any [`AppError`]; nothing is downloaded if resolution fails.
    #[instrument(skip(self, request), fields(reference = %request.reference, mode = %request.mode, list = request.list))]
    pub async fn run(&self, request: &DownloadRequest) -> Result<BatchReport, AppError> {
        let items = self.resolve(&request.reference, request.list).await?;
        info!(count = items.len(), "resolved items");
        self.download(items, request.target_dir.clone(), request.mode)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = DownloaderConfig {
            max_attempts: 0,
            ..DownloaderConfig::default()
        };
        assert!(matches!(
            Downloader::new(&config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_reference_before_any_request() {
        // Port 9 is discard; a request would fail with a network error instead.
        let config = DownloaderConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..DownloaderConfig::default()
        };
        let downloader = Downloader::new(&config).unwrap();
        let result = downloader.resolve("not-a-bvid", false).await;
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_client_error_display() {
        let error = AppError::from(DownloadError::invalid_url("nope"));
        assert!(error.to_string().starts_with("failed to initialize HTTP client"));
    }
}

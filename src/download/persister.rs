//! Streaming media download into a destination file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, RANGE};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

use super::client::HttpClient;
use super::constants::{CHUNK_SIZE, FULL_RANGE};
use super::error::DownloadError;
use crate::media::{MediaItem, StreamKind};

/// Result of one completed stream persist, used for reporting only.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    /// The item whose stream was written.
    pub item: MediaItem,
    /// Which elementary stream was written.
    pub kind: StreamKind,
    /// Destination file.
    pub path: PathBuf,
    /// Total body bytes written.
    pub bytes_written: u64,
    /// Wall time from request to flushed file.
    pub elapsed: Duration,
}

impl DownloadOutcome {
    /// Returns the elapsed time in fractional seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Writes a media response body to disk.
///
/// Every persist starts from byte 0 and truncates the destination; a file
/// left by an earlier, larger run is fully replaced.
#[derive(Debug, Clone)]
pub struct StreamPersister {
    client: HttpClient,
}

impl StreamPersister {
    /// Creates a persister using `client` (normally [`HttpClient::for_media`]).
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Streams `url` into `dest`.
    ///
    /// The request carries `Range: bytes=0-`. The destination is only
    /// created once the server answered with a success status; its parent
    /// directory must already exist.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::HttpStatus`] and friends if the initial request fails
    /// - [`DownloadError::Io`] if the destination cannot be created or written
    /// - [`DownloadError::Transport`] if the body fails mid-stream; the partial
    ///   file is left in place
    #[instrument(skip(self, item, url, headers), fields(bvid = %item.base_id, cid = %item.stream_id, kind = %kind, dest = %dest.display()))]
    pub async fn persist(
        &self,
        item: &MediaItem,
        kind: StreamKind,
        url: &str,
        dest: &Path,
        mut headers: HeaderMap,
    ) -> Result<DownloadOutcome, DownloadError> {
        let started = Instant::now();
        headers.insert(RANGE, HeaderValue::from_static(FULL_RANGE));

        let response = self.client.get(url, headers).await?;
        debug!(status = response.status().as_u16(), "media response received");

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let bytes_written = stream_to_file(file, response, url, dest).await?;

        let outcome = DownloadOutcome {
            item: item.clone(),
            kind,
            path: dest.to_path_buf(),
            bytes_written,
            elapsed: started.elapsed(),
        };
        info!(
            bytes = bytes_written,
            elapsed_secs = outcome.elapsed_seconds(),
            "stream persisted"
        );
        Ok(outcome)
    }
}

/// Streams the response body to `file` in [`CHUNK_SIZE`] writes, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // Keep what already arrived on disk.
                let _ = writer.flush().await;
                return Err(DownloadError::transport(url, path, e));
            }
        };

        for piece in chunk.chunks(CHUNK_SIZE) {
            writer
                .write_all(piece)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
        }
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(path, e))?;

    Ok(bytes_written)
}

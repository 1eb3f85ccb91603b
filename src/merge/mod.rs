//! Audio/video pairing and multiplexing.
//!
//! [`Merger`] scans a workspace for video artifacts, pairs each with the
//! audio artifact sharing its base name, and hands the pair to a [`Muxer`].
//! The muxed file lands in the output directory under the video's file name.

mod error;
mod muxer;

pub use error::MergeError;
pub use muxer::{FfmpegMuxer, Muxer};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::DownloaderConfig;

/// One matched audio/video pair and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeJob {
    /// Video artifact in the workspace.
    pub video: PathBuf,
    /// Audio artifact derived from the video's base name.
    pub audio: PathBuf,
    /// Muxed output path.
    pub output: PathBuf,
}

/// Pairs artifacts by base name and multiplexes them.
#[derive(Clone)]
pub struct Merger {
    muxer: Arc<dyn Muxer>,
    audio_extension: String,
    video_extension: String,
}

impl Merger {
    /// Creates a merger for the given artifact extensions (without dots).
    #[must_use]
    pub fn new(
        muxer: Arc<dyn Muxer>,
        audio_extension: impl Into<String>,
        video_extension: impl Into<String>,
    ) -> Self {
        Self {
            muxer,
            audio_extension: audio_extension.into(),
            video_extension: video_extension.into(),
        }
    }

    /// Creates a merger using the configured extensions.
    #[must_use]
    pub fn from_config(config: &DownloaderConfig, muxer: Arc<dyn Muxer>) -> Self {
        Self::new(
            muxer,
            config.audio_extension.clone(),
            config.video_extension.clone(),
        )
    }

    /// Checks that the underlying muxer can run.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Spawn`] if it cannot.
    pub fn ensure_available(&self) -> Result<(), MergeError> {
        self.muxer.ensure_available()
    }

    /// Lists one job per video artifact in `temp_dir`, sorted by path.
    ///
    /// Audio presence is not checked here; see [`merge_job`](Self::merge_job).
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Io`] if `temp_dir` cannot be read.
    pub async fn discover(
        &self,
        temp_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<MergeJob>, MergeError> {
        let mut entries = tokio::fs::read_dir(temp_dir)
            .await
            .map_err(|e| MergeError::io(temp_dir, e))?;

        let mut jobs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MergeError::io(temp_dir, e))?
        {
            let video = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| MergeError::io(&video, e))?
                .is_file();
            if !is_file || !has_extension(&video, &self.video_extension) {
                continue;
            }
            let Some(file_name) = video.file_name() else {
                continue;
            };
            jobs.push(MergeJob {
                audio: video.with_extension(&self.audio_extension),
                output: output_dir.join(file_name),
                video,
            });
        }

        jobs.sort_by(|a, b| a.video.cmp(&b.video));
        debug!(count = jobs.len(), dir = %temp_dir.display(), "discovered merge jobs");
        Ok(jobs)
    }

    /// Muxes one pair.
    ///
    /// # Errors
    ///
    /// - [`MergeError::MissingCounterpart`] if the audio artifact is absent
    /// - any error from the muxer
    #[instrument(skip(self, job), fields(output = %job.output.display()))]
    pub async fn merge_job(&self, job: &MergeJob) -> Result<PathBuf, MergeError> {
        let audio_exists = tokio::fs::try_exists(&job.audio)
            .await
            .map_err(|e| MergeError::io(&job.audio, e))?;
        if !audio_exists {
            return Err(MergeError::MissingCounterpart {
                video: job.video.clone(),
                expected_audio: job.audio.clone(),
            });
        }

        self.muxer.mux(&job.video, &job.audio, &job.output).await?;
        info!("merged");
        Ok(job.output.clone())
    }

    /// Merges every pair found in `temp_dir` into `output_dir`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`MergeError`] encountered.
    #[instrument(skip(self), fields(temp_dir = %temp_dir.display(), output_dir = %output_dir.display()))]
    pub async fn merge(
        &self,
        temp_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, MergeError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| MergeError::io(output_dir, e))?;

        let jobs = self.discover(temp_dir, output_dir).await?;
        let mut merged = Vec::with_capacity(jobs.len());
        for job in &jobs {
            merged.push(self.merge_job(job).await?);
        }
        Ok(merged)
    }
}

impl fmt::Debug for Merger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Merger")
            .field("muxer", &self.muxer)
            .field("audio_extension", &self.audio_extension)
            .field("video_extension", &self.video_extension)
            .finish()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

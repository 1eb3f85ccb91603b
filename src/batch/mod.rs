//! Batch orchestration: a resolved item list to files on disk.
//!
//! A [`BatchJob`] pairs the items with a target directory and a
//! [`DownloadMode`]. The [`BatchOrchestrator`] downloads every stream the
//! mode requires through a bounded worker pool and, in combined mode, merges
//! the pairs out of a [`TempWorkspace`] that is removed afterwards.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bilidown_core::{
//!     BatchJob, BatchOrchestrator, BrowserHeaderProvider, DownloadMode, DownloaderConfig,
//!     FfmpegMuxer, MediaItem,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloaderConfig::default();
//! let headers = Arc::new(BrowserHeaderProvider::from_config(&config)?);
//! let muxer = Arc::new(FfmpegMuxer::from_config(&config));
//! let orchestrator = BatchOrchestrator::new(&config, headers, muxer)?;
//!
//! let items = vec![MediaItem::new("BV1xx411c7mD", "4242", "Intro")];
//! let report = orchestrator
//!     .run(&BatchJob::new(items, "out", DownloadMode::Combined))
//!     .await?;
//! println!("Download Finish All! Time consuming: {} seconds", report.elapsed_seconds());
//! # Ok(())
//! # }
//! ```

mod error;
mod orchestrator;
mod workspace;

pub use error::{BatchError, ItemError};
pub use orchestrator::BatchOrchestrator;
pub use workspace::TempWorkspace;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::download::DownloadOutcome;
use crate::media::{MediaItem, StreamKind};
use crate::merge::MergeError;

/// Which streams a batch downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadMode {
    /// Audio streams only, written straight into the target directory.
    AudioOnly,
    /// Video streams only, written straight into the target directory.
    VideoOnly,
    /// Both streams, merged into the target directory.
    Combined,
}

impl DownloadMode {
    /// Stream kinds fetched per item, in download order.
    #[must_use]
    pub fn kinds(self) -> &'static [StreamKind] {
        match self {
            Self::AudioOnly => &[StreamKind::Audio],
            Self::VideoOnly => &[StreamKind::Video],
            Self::Combined => &[StreamKind::Audio, StreamKind::Video],
        }
    }

    /// Returns true if downloads go through the temporary workspace and merger.
    #[must_use]
    pub fn is_combined(self) -> bool {
        self == Self::Combined
    }

    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AudioOnly => "audio",
            Self::VideoOnly => "video",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation's worth of work. Not mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// Items in the order they were resolved.
    pub items: Vec<MediaItem>,
    /// Directory receiving the final artifacts.
    pub target_dir: PathBuf,
    /// Streams to fetch.
    pub mode: DownloadMode,
}

impl BatchJob {
    /// Creates a job.
    #[must_use]
    pub fn new(items: Vec<MediaItem>, target_dir: impl Into<PathBuf>, mode: DownloadMode) -> Self {
        Self {
            items,
            target_dir: target_dir.into(),
            mode,
        }
    }
}

/// Progress notifications emitted while a batch runs.
///
/// Emission order across items follows completion, not input order.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A worker picked up an item.
    ItemStarted {
        /// Zero-based position in the job.
        index: usize,
        /// The item.
        item: MediaItem,
    },
    /// One stream of an item was written.
    StreamCompleted {
        /// Zero-based position in the job.
        index: usize,
        /// What was written.
        outcome: DownloadOutcome,
    },
    /// An item failed.
    ItemFailed {
        /// Zero-based position in the job.
        index: usize,
        /// Title of the item.
        title: String,
        /// Rendered error.
        error: String,
    },
    /// A pair was merged.
    Merged {
        /// Muxed output file.
        output: PathBuf,
    },
    /// A pair could not be merged.
    MergeFailed {
        /// Video artifact of the pair.
        video: PathBuf,
        /// Rendered error.
        error: String,
    },
}

/// One item that did not complete.
#[derive(Debug)]
pub struct ItemFailure {
    /// Zero-based position in the job.
    pub index: usize,
    /// The failed item.
    pub item: MediaItem,
    /// What went wrong.
    pub error: ItemError,
}

/// Aggregated result of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    /// Number of items in the job.
    pub items: usize,
    /// Every stream written, in job order.
    pub outcomes: Vec<DownloadOutcome>,
    /// Muxed outputs (combined mode), sorted by path.
    pub merged: Vec<PathBuf>,
    /// Items that failed, in job order.
    pub failures: Vec<ItemFailure>,
    /// Pairs that could not be merged.
    pub merge_failures: Vec<MergeError>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Returns the total elapsed time in fractional seconds.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Returns true if every item and every merge succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.merge_failures.is_empty()
    }

    /// Total body bytes written across all streams.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_written).sum()
    }
}

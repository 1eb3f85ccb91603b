//! Error types for batch orchestration.

use std::path::PathBuf;

use thiserror::Error;

use super::BatchReport;
use crate::download::DownloadError;
use crate::merge::MergeError;
use crate::resolver::ResolveError;

/// Why a single item could not be downloaded.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The media URL could not be located.
    #[error(transparent)]
    Locate(#[from] ResolveError),

    /// The media stream could not be persisted.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Errors that end a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The combined-mode temporary workspace could not be created or removed.
    #[error("temporary workspace error at {path}: {source}")]
    Workspace {
        /// Workspace (or its parent) path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The target directory could not be created.
    #[error("cannot create target directory {path}: {source}")]
    FileSystem {
        /// Directory that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An item failed and the batch was aborted.
    #[error("item {} ({title}) failed: {source}", .index + 1)]
    Item {
        /// Zero-based position of the item in the batch.
        index: usize,
        /// Title of the failed item.
        title: String,
        /// What went wrong.
        #[source]
        source: ItemError,
    },

    /// The merge step failed, or the multiplexer is unavailable.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// The run finished but some items or merges failed.
    #[error(
        "batch finished with {} failed item(s) and {} failed merge(s)",
        .report.failures.len(),
        .report.merge_failures.len()
    )]
    Partial {
        /// Everything that did and did not complete.
        report: Box<BatchReport>,
    },

    /// The worker pool shut down unexpectedly.
    #[error("worker pool closed unexpectedly")]
    SemaphoreClosed,
}

impl BatchError {
    /// Creates a workspace error.
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    /// Creates a file-system error.
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Returns the partial report carried by [`BatchError::Partial`].
    #[must_use]
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            Self::Partial { report } => Some(report),
            _ => None,
        }
    }
}

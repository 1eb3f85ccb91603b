//! Error types for the merge step.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while combining audio/video pairs.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A video artifact has no audio sibling with the same base name.
    #[error("missing counterpart for {video}: expected {expected_audio}")]
    MissingCounterpart {
        /// The video artifact that was found.
        video: PathBuf,
        /// The audio path derived from it.
        expected_audio: PathBuf,
    },

    /// The multiplexer could not be located or started.
    #[error(
        "cannot run multiplexer {program}: {reason}\n  Suggestion: install ffmpeg or pass --ffmpeg <PATH>"
    )]
    Spawn {
        /// Program that was requested.
        program: PathBuf,
        /// Why it could not be started.
        reason: String,
    },

    /// The multiplexer exited unsuccessfully.
    #[error("multiplexer {program} failed for {output} (exit code {}): {stderr}", display_code(.code.as_ref()))]
    Failed {
        /// Program that was run.
        program: PathBuf,
        /// Output file it was asked to produce.
        output: PathBuf,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Tail of the captured standard error.
        stderr: String,
    },

    /// Fewer merged files were produced than items were downloaded.
    #[error("only {merged} of {expected} downloaded item(s) produced a merged file; titles may collide")]
    Shortfall {
        /// Items whose streams were both downloaded.
        expected: usize,
        /// Merged files actually produced.
        merged: usize,
    },

    /// File system error while scanning inputs or preparing the output directory.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a spawn error.
    pub fn spawn(program: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

fn display_code(code: Option<&i32>) -> String {
    code.map_or_else(|| "none".to_string(), ToString::to_string)
}

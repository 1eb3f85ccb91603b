//! Error types for metadata resolution and stream location.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors raised while turning references into items and items into media URLs.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The platform answered with an error status, an error code, or a body
    /// missing expected fields.
    #[error("unexpected platform response for {context}: {reason}")]
    Upstream {
        /// What was being resolved (identifier, optionally with stream id/kind).
        context: String,
        /// What was wrong with the response.
        reason: String,
    },

    /// The requested sub-unit does not exist.
    #[error(
        "{base_id} has no sub-unit {index} ({available} available)\n  Suggestion: pick an index between 1 and {available}, or use --list to download every sub-unit"
    )]
    NotFound {
        /// The base identifier that was looked up.
        base_id: String,
        /// The 1-based sub-index that was requested.
        index: u32,
        /// Number of sub-units the platform reported.
        available: usize,
    },

    /// The request itself failed (network, timeout, exhausted retries).
    #[error(transparent)]
    Fetch(#[from] DownloadError),
}

impl ResolveError {
    /// Creates an upstream-shape error.
    pub fn upstream(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Creates a sub-index out-of-range error.
    pub fn not_found(base_id: impl Into<String>, index: u32, available: usize) -> Self {
        Self::NotFound {
            base_id: base_id.into(),
            index,
            available,
        }
    }
}

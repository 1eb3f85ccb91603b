//! Error types for item reference parsing.

use thiserror::Error;

/// Errors that can occur while parsing an item reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The reference was empty after trimming whitespace.
    #[error("empty reference\n  Suggestion: Pass a 12-character bvid such as BV1xx411c7mD")]
    Empty,

    /// The reference does not start with a valid base identifier.
    #[error("invalid reference '{input}': {reason}\n  Suggestion: {suggestion}")]
    InvalidReference {
        /// The input that failed to parse
        input: String,
        /// Why the input was rejected
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The sub-index suffix is zero or not a number.
    #[error("invalid sub-index in '{input}': {reason}\n  Suggestion: Sub-indices start at 1, e.g. BV1xx411c7mD_p2")]
    InvalidSubIndex {
        /// The input carrying the bad suffix
        input: String,
        /// Why the suffix was rejected
        reason: String,
    },
}

impl ParseError {
    /// Creates an `InvalidReference` error for a malformed base identifier.
    #[must_use]
    pub fn malformed(input: &str, reason: &str) -> Self {
        Self::InvalidReference {
            input: input.to_string(),
            reason: reason.to_string(),
            suggestion: "Use the 12-character bvid, optionally followed by a sub-index like _p2"
                .to_string(),
        }
    }

    /// Creates an `InvalidSubIndex` error.
    #[must_use]
    pub fn sub_index(input: &str, reason: &str) -> Self {
        Self::InvalidSubIndex {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

//! Retry budget and randomized inter-attempt delay for platform requests.
//!
//! Every failure of a metadata or playback-info request is retried while
//! attempts remain; the wait between attempts is drawn uniformly from a
//! configured [`DelayWindow`]. [`classify_error`] labels failures for logs
//! only and does not change the decision.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use bilidown_core::DelayWindow;
//! use bilidown_core::download::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, DelayWindow::from_millis(10, 20));
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 2);
//!         assert!(delay >= Duration::from_millis(10));
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use crate::config::{DEFAULT_MAX_ATTEMPTS, DelayWindow, DownloaderConfig};

/// Label attached to a failure in retry logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry (timeouts, 5xx, resets).
    Transient,
    /// Failure unlikely to change on retry (4xx, bad URL, local IO).
    Permanent,
    /// Upstream throttling (HTTP 412 or 429).
    RateLimited,
}

impl FailureType {
    /// Returns the lowercase label used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the request.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt budget plus randomized delay window.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `delay`: uniform in [1s, 3s]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Window the inter-attempt wait is sampled from.
    delay: DelayWindow,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DelayWindow::from_millis(1000, 3000),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: DelayWindow) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates the policy described by the shared configuration.
    #[must_use]
    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay)
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the inter-attempt delay window.
    #[must_use]
    pub fn delay_window(&self) -> DelayWindow {
        self.delay
    }

    /// Determines whether to retry after attempt number `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.delay.sample();
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Labels a download error for retry logging.
///
/// | Error | Label |
/// |-------|-------|
/// | HTTP 412 / 429 | RateLimited |
/// | HTTP 408 / 5xx | Transient |
/// | other HTTP 4xx | Permanent |
/// | Timeout, Network, Transport | Transient |
/// | Io, InvalidUrl, Client | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Timeout { .. }
        | DownloadError::Network { .. }
        | DownloadError::Transport { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } | DownloadError::Client { .. } => {
            FailureType::Permanent
        }
        DownloadError::RetriesExhausted { source, .. } => classify_error(source),
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        // The platform answers throttled clients with 412 Precondition Failed.
        412 | 429 => FailureType::RateLimited,
        408 => FailureType::Transient,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

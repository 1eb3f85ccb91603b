//! Runtime configuration shared by every pipeline component.
//!
//! All tunables (retry budget, delay windows, credential token, artifact
//! extensions, multiplexer location, worker-pool size) live in one
//! [`DownloaderConfig`] value that is built once and passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use reqwest::header::HeaderValue;
use thiserror::Error;
use url::Url;

/// Default platform API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.bilibili.com";

/// Default site origin used for Referer/Origin headers.
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.bilibili.com";

/// Default attempt budget for metadata/location requests.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default request timeout for metadata/location calls (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default TCP connect timeout for all clients.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default fixed cool-down after each completed item.
pub const DEFAULT_ITEM_COOLDOWN: Duration = Duration::from_secs(1);

/// Maximum allowed worker-pool size.
pub const MAX_CONCURRENCY: usize = 16;

/// Errors raised when a configuration value is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric or structural value is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A delay window whose minimum exceeds its maximum.
    #[error("invalid delay window `{field}`: min {min:?} exceeds max {max:?}")]
    InvertedWindow {
        /// Name of the offending window.
        field: &'static str,
        /// Configured lower bound.
        min: Duration,
        /// Configured upper bound.
        max: Duration,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// A closed interval from which a delay is sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    /// Lower bound (inclusive).
    pub min: Duration,
    /// Upper bound (inclusive).
    pub max: Duration,
}

impl DelayWindow {
    /// A window that never sleeps.
    pub const ZERO: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Creates a window from explicit bounds.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Creates a window from bounds expressed in milliseconds.
    #[must_use]
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Returns true when the window can only yield a zero delay.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }

    /// Samples a delay uniformly from the window.
    ///
    /// A degenerate window (`max <= min`) always yields `min`.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min_us = duration_to_micros(self.min);
        let max_us = duration_to_micros(self.max);
        let mut rng = rand::thread_rng();
        Duration::from_micros(rng.gen_range(min_us..=max_us))
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedWindow {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

fn duration_to_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// What the batch does when one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop dispatching further items after the first failure.
    #[default]
    AbortBatch,
    /// Keep processing the remaining items and report all failures at the end.
    ContinueOnError,
}

/// Configuration threaded through every pipeline component.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Platform API root, e.g. `https://api.bilibili.com`.
    pub api_base_url: String,
    /// Site origin used for Referer/Origin headers.
    pub site_origin: String,
    /// Attempt budget for metadata/location requests (including the first).
    pub max_attempts: u32,
    /// Randomized wait between failed attempts.
    pub retry_delay: DelayWindow,
    /// Politeness window before every stream-location request.
    pub request_delay: DelayWindow,
    /// Stricter window applied once per item before the media download phase.
    pub media_delay: DelayWindow,
    /// Fixed cool-down after each completed item.
    pub item_cooldown: Duration,
    /// Total timeout for metadata/location requests.
    pub request_timeout: Duration,
    /// TCP connect timeout for every client.
    pub connect_timeout: Duration,
    /// Optional per-read stall timeout for media streams.
    pub media_read_timeout: Option<Duration>,
    /// Static credential token sent as the `Cookie` header.
    pub cookie: Option<String>,
    /// Extension of audio artifacts (without the dot).
    pub audio_extension: String,
    /// Extension of video and merged artifacts (without the dot).
    pub video_extension: String,
    /// External multiplexer executable.
    pub muxer_program: PathBuf,
    /// Parent directory for the combined-mode temporary workspace.
    pub temp_parent: Option<PathBuf>,
    /// Number of items processed at the same time.
    pub concurrency: usize,
    /// Batch reaction to a failed item.
    pub failure_policy: FailurePolicy,
    /// Replace path-hostile characters in titles before using them as filenames.
    pub sanitize_titles: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DelayWindow::from_millis(1000, 3000),
            request_delay: DelayWindow::from_millis(1000, 3000),
            media_delay: DelayWindow::from_millis(3000, 8000),
            item_cooldown: DEFAULT_ITEM_COOLDOWN,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            media_read_timeout: None,
            cookie: None,
            audio_extension: "mp3".to_string(),
            video_extension: "mp4".to_string(),
            muxer_program: PathBuf::from("ffmpeg"),
            temp_parent: None,
            concurrency: 1,
            failure_policy: FailurePolicy::AbortBatch,
            sanitize_titles: false,
        }
    }
}

impl DownloaderConfig {
    /// Returns a copy with every politeness and retry delay disabled.
    ///
    /// Intended for tests and local mirrors that do not throttle.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.retry_delay = DelayWindow::ZERO;
        self.request_delay = DelayWindow::ZERO;
        self.media_delay = DelayWindow::ZERO;
        self.item_cooldown = Duration::ZERO;
        self
    }

    /// Returns the API root with any trailing slash removed.
    #[must_use]
    pub fn api_root(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Returns the site origin with any trailing slash removed.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.site_origin.trim_end_matches('/')
    }

    /// Validates all values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_url("site_origin", &self.site_origin)?;

        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::invalid(
                "concurrency",
                format!(
                    "{} is outside the range 1..={MAX_CONCURRENCY}",
                    self.concurrency
                ),
            ));
        }

        self.retry_delay.validate("retry_delay")?;
        self.request_delay.validate("request_delay")?;
        self.media_delay.validate("media_delay")?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout", "must be non-zero"));
        }
        if self.media_read_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::invalid("media_read_timeout", "must be non-zero"));
        }

        validate_extension("audio_extension", &self.audio_extension)?;
        validate_extension("video_extension", &self.video_extension)?;
        if self
            .audio_extension
            .eq_ignore_ascii_case(&self.video_extension)
        {
            return Err(ConfigError::invalid(
                "audio_extension",
                "audio and video extensions must differ",
            ));
        }

        if let Some(cookie) = &self.cookie
            && HeaderValue::from_str(cookie).is_err()
        {
            return Err(ConfigError::invalid(
                "cookie",
                "contains characters not allowed in an HTTP header",
            ));
        }

        if self.muxer_program.as_os_str().is_empty() {
            return Err(ConfigError::invalid("muxer_program", "must not be empty"));
        }

        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(value)
        .map_err(|e| ConfigError::invalid(field, format!("'{value}' is not a valid URL: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            field,
            format!("'{value}' must use http or https"),
        ));
    }
    Ok(())
}

fn validate_extension(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    if value.starts_with('.') || value.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            field,
            format!("'{value}' must be a bare extension such as `mp4`"),
        ));
    }
    Ok(())
}

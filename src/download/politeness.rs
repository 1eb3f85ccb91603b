//! Unconditional inter-request delays.
//!
//! Unlike adaptive throttling, these sleeps ignore response codes: a random
//! wait before every location call, a stricter random wait before each item's
//! media phase, and a fixed cool-down once an item is done.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{DelayWindow, DownloaderConfig};

/// Sleeps between platform requests to stay under upstream throttling.
///
/// # Example
///
/// ```
/// use bilidown_core::PolitenessGovernor;
///
/// # tokio_test::block_on(async {
/// let governor = PolitenessGovernor::disabled();
/// governor.delay_before_request().await; // returns immediately
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessGovernor {
    request_window: DelayWindow,
    media_window: DelayWindow,
    item_cooldown: Duration,
}

impl PolitenessGovernor {
    /// Creates a governor with explicit windows.
    #[must_use]
    pub fn new(request_window: DelayWindow, media_window: DelayWindow, item_cooldown: Duration) -> Self {
        Self {
            request_window,
            media_window,
            item_cooldown,
        }
    }

    /// Creates the governor described by the shared configuration.
    #[must_use]
    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.request_delay, config.media_delay, config.item_cooldown)
    }

    /// Creates a governor that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(DelayWindow::ZERO, DelayWindow::ZERO, Duration::ZERO)
    }

    /// Returns true if no delay will ever be applied.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.request_window.is_zero() && self.media_window.is_zero() && self.item_cooldown.is_zero()
    }

    /// Waits a random duration from the request window.
    ///
    /// Returns the delay that was applied.
    #[instrument(level = "debug", skip(self))]
    pub async fn delay_before_request(&self) -> Duration {
        sleep_logged(self.request_window.sample(), "request").await
    }

    /// Waits a random duration from the stricter media window.
    ///
    /// Returns the delay that was applied.
    #[instrument(level = "debug", skip(self))]
    pub async fn delay_before_media(&self) -> Duration {
        sleep_logged(self.media_window.sample(), "media").await
    }

    /// Waits the fixed per-item cool-down.
    ///
    /// Returns the delay that was applied.
    #[instrument(level = "debug", skip(self))]
    pub async fn delay_after_item(&self) -> Duration {
        sleep_logged(self.item_cooldown, "cooldown").await
    }
}

async fn sleep_logged(delay: Duration, phase: &'static str) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    debug!(
        phase,
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "politeness delay"
    );
    tokio::time::sleep(delay).await;
    delay
}

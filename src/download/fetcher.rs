//! Bounded-retry GET for metadata and playback-info requests.

use reqwest::Response;
use reqwest::header::HeaderMap;
use tracing::{debug, instrument, warn};

use super::client::HttpClient;
use super::constants::MAX_LOGGED_RETRY_AFTER_LEN;
use super::error::DownloadError;
use super::retry::{RetryDecision, RetryPolicy, classify_error};

/// Executes a GET, retrying every failure with a randomized wait until the
/// attempt budget is spent.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: HttpClient,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    /// Creates a fetcher over `client` governed by `policy`.
    #[must_use]
    pub fn new(client: HttpClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns the retry policy in effect.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url`, retrying on network failures, timeouts and non-2xx statuses.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::RetriesExhausted`] wrapping the final attempt's
    /// failure once every attempt has failed.
    #[instrument(skip(self, headers), fields(url = %url, max_attempts = self.policy.max_attempts()))]
    pub async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<Response, DownloadError> {
        let mut attempt: u32 = 1;
        loop {
            let error = match self.client.get(url, headers.clone()).await {
                Ok(response) => {
                    debug!(attempt, "fetch succeeded");
                    return Ok(response);
                }
                Err(error) => error,
            };

            match self.policy.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    let retry_after = match &error {
                        DownloadError::HttpStatus {
                            retry_after: Some(value),
                            ..
                        } => Some(truncate_for_log(value)),
                        _ => None,
                    };
                    warn!(
                        attempt,
                        next_attempt = next,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        failure = classify_error(&error).as_str(),
                        retry_after = retry_after.as_deref().unwrap_or("-"),
                        error = %error,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(attempt, %reason, "not retrying");
                    return Err(DownloadError::retries_exhausted(url, attempt, error));
                }
            }
        }
    }
}

fn truncate_for_log(value: &str) -> &str {
    match value.char_indices().nth(MAX_LOGGED_RETRY_AFTER_LEN) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

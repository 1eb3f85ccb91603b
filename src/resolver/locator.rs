//! Playback-info lookup: item + stream kind to a direct media URL.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use super::api::PlayUrlResponse;
use super::error::ResolveError;
use crate::download::{DownloadError, ResilientFetcher};
use crate::headers::HeaderProvider;
use crate::media::{MediaItem, StreamKind};

/// Path of the playback-info endpoint below the API root.
const PLAY_URL_PATH: &str = "/x/player/playurl";

/// `fnval` flag asking for separate DASH audio/video representations.
const FNVAL_DASH: &str = "16";

/// Finds the media URL of one elementary stream.
///
/// Always takes the first representation listed for the requested kind; the
/// platform orders them best quality first.
pub struct StreamLocator {
    fetcher: ResilientFetcher,
    headers: Arc<dyn HeaderProvider>,
    api_root: String,
}

impl StreamLocator {
    /// Creates a locator issuing requests through `fetcher` against `api_root`.
    #[must_use]
    pub fn new(
        fetcher: ResilientFetcher,
        headers: Arc<dyn HeaderProvider>,
        api_root: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            headers,
            api_root: api_root.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the media URL for `kind` of `item`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Upstream`] if the body is malformed, carries an error
    ///   code, or lists no representation for `kind`
    /// - [`ResolveError::Fetch`] once the fetcher's retries are exhausted
    #[instrument(skip(self, item), fields(bvid = %item.base_id, cid = %item.stream_id, kind = %kind))]
    pub async fn locate_stream(
        &self,
        item: &MediaItem,
        kind: StreamKind,
    ) -> Result<String, ResolveError> {
        let context = format!("{}/{} {kind}", item.base_id, item.stream_id);
        let url = Url::parse_with_params(
            &format!("{}{PLAY_URL_PATH}", self.api_root),
            &[
                ("fnval", FNVAL_DASH),
                ("bvid", item.base_id.as_str()),
                ("cid", item.stream_id.as_str()),
            ],
        )
        .map_err(|_| DownloadError::invalid_url(&self.api_root))?;

        let response = self
            .fetcher
            .fetch(url.as_str(), &self.headers.api_headers())
            .await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        let parsed: PlayUrlResponse = serde_json::from_slice(&body).map_err(|e| {
            ResolveError::upstream(&context, format!("malformed playback-info body: {e}"))
        })?;

        if parsed.code != 0 {
            return Err(ResolveError::upstream(
                &context,
                format!("platform error code {}: {}", parsed.code, parsed.message),
            ));
        }

        let dash = parsed
            .data
            .and_then(|data| data.dash)
            .ok_or_else(|| ResolveError::upstream(&context, "playback info has no dash section"))?;
        let representations = match kind {
            StreamKind::Audio => dash.audio,
            StreamKind::Video => dash.video,
        };

        let media_url = representations
            .and_then(|list| list.into_iter().next())
            .map(|representation| representation.base_url)
            .ok_or_else(|| {
                ResolveError::upstream(&context, format!("no {kind} representation listed"))
            })?;

        debug!(media_url = %media_url, "located stream");
        Ok(media_url)
    }
}

impl fmt::Debug for StreamLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamLocator")
            .field("api_root", &self.api_root)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{DelayWindow, DownloaderConfig};
    use crate::download::{HttpClient, RetryPolicy};
    use crate::headers::StaticHeaderProvider;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator(server: &MockServer, attempts: u32) -> StreamLocator {
        let client = HttpClient::for_api(&DownloaderConfig::default()).unwrap();
        StreamLocator::new(
            ResilientFetcher::new(client, RetryPolicy::new(attempts, DelayWindow::ZERO)),
            Arc::new(StaticHeaderProvider::default()),
            server.uri(),
        )
    }

    fn item() -> MediaItem {
        MediaItem::new("BV1xx411c7mD", "4242", "Intro")
    }

    #[tokio::test]
    async fn test_locate_stream_picks_first_representation() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path(PLAY_URL_PATH))
            .and(query_param("fnval", "16"))
            .and(query_param("bvid", "BV1xx411c7mD"))
            .and(query_param("cid", "4242"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"dash": {
                    "audio": [{"baseUrl": "https://cdn/a-best", "bandwidth": 1}, {"baseUrl": "https://cdn/a-low", "bandwidth": 999}],
                    "video": [{"baseUrl": "https://cdn/v-best"}]
                }}
            })))
            .mount(&server)
            .await;

        let locator = locator(&server, 1);
        assert_eq!(
            locator.locate_stream(&item(), StreamKind::Audio).await.unwrap(),
            "https://cdn/a-best"
        );
        assert_eq!(
            locator.locate_stream(&item(), StreamKind::Video).await.unwrap(),
            "https://cdn/v-best"
        );
    }

    #[tokio::test]
    async fn test_locate_stream_empty_list_is_upstream() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "data": {"dash": {"audio": [], "video": [{"baseUrl": "https://cdn/v"}]}}
            })))
            .mount(&server)
            .await;

        let result = locator(&server, 1).locate_stream(&item(), StreamKind::Audio).await;
        match result {
            Err(ResolveError::Upstream { reason, .. }) => assert!(reason.contains("audio")),
            other => panic!("Expected Upstream, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_locate_stream_missing_dash_is_upstream() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {"durl": []}})),
            )
            .mount(&server)
            .await;

        let result = locator(&server, 1).locate_stream(&item(), StreamKind::Video).await;
        assert!(matches!(result, Err(ResolveError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_locate_stream_retries_then_wraps_fetch_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(412))
            .expect(3)
            .mount(&server)
            .await;

        let result = locator(&server, 3).locate_stream(&item(), StreamKind::Video).await;
        assert!(matches!(
            result,
            Err(ResolveError::Fetch(DownloadError::RetriesExhausted { attempts: 3, .. }))
        ));
    }
}

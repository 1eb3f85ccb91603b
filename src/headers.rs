//! Per-request header manufacturing.
//!
//! The platform rejects bare API clients, so every request carries a
//! browser-like identity with matching Referer/Origin values. Header
//! construction sits behind [`HeaderProvider`] so tests can inject a
//! deterministic set.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE, HeaderMap, HeaderName, HeaderValue, ORIGIN,
    PRAGMA, REFERER, USER_AGENT,
};
use tracing::debug;

use crate::config::{ConfigError, DownloaderConfig};
use crate::media::MediaItem;

/// Browser identities rotated across requests.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) \
     Version/17.4 Safari/605.1.15",
];

/// Fallback identity used by [`StaticHeaderProvider`].
pub const STATIC_USER_AGENT: &str = concat!("bilidown/", env!("CARGO_PKG_VERSION"));

/// Supplies the headers attached to platform requests.
pub trait HeaderProvider: Send + Sync + fmt::Debug {
    /// Headers for metadata and playback-info API calls.
    fn api_headers(&self) -> HeaderMap;

    /// Headers for the media download of `item`.
    ///
    /// The byte-range header is added by the persister, not here.
    fn media_headers(&self, item: &MediaItem) -> HeaderMap;
}

/// Production provider that rotates browser identities.
#[derive(Clone)]
pub struct BrowserHeaderProvider {
    site_origin: String,
    cookie: Option<HeaderValue>,
}

impl BrowserHeaderProvider {
    /// Creates a provider for `site_origin` with an optional static credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the origin or cookie cannot be sent as a header value.
    pub fn new(site_origin: &str, cookie: Option<&str>) -> Result<Self, ConfigError> {
        let site_origin = site_origin.trim_end_matches('/').to_string();
        HeaderValue::from_str(&site_origin)
            .map_err(|_| ConfigError::invalid("site_origin", "not a valid header value"))?;
        let cookie = cookie
            .map(|value| {
                let mut header = HeaderValue::from_str(value).map_err(|_| {
                    ConfigError::invalid("cookie", "not a valid header value")
                })?;
                header.set_sensitive(true);
                Ok::<_, ConfigError>(header)
            })
            .transpose()?;
        Ok(Self {
            site_origin,
            cookie,
        })
    }

    /// Creates a provider from the shared configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the origin or cookie cannot be sent as a header value.
    pub fn from_config(config: &DownloaderConfig) -> Result<Self, ConfigError> {
        Self::new(config.origin(), config.cookie.as_deref())
    }

    fn base_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        insert_dynamic(&mut headers, REFERER, referer);
        insert_dynamic(&mut headers, ORIGIN, &self.site_origin);
        headers
    }
}

impl fmt::Debug for BrowserHeaderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserHeaderProvider")
            .field("site_origin", &self.site_origin)
            .field("has_cookie", &self.cookie.is_some())
            .finish()
    }
}

impl HeaderProvider for BrowserHeaderProvider {
    fn api_headers(&self) -> HeaderMap {
        self.base_headers(&self.site_origin)
    }

    fn media_headers(&self, item: &MediaItem) -> HeaderMap {
        let referer = format!("{}/video/{}", self.site_origin, item.base_id);
        let mut headers = self.base_headers(&referer);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("video"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("same-site"),
        );

        match &self.cookie {
            Some(cookie) => {
                headers.insert(COOKIE, cookie.clone());
            }
            None => insert_dynamic(&mut headers, COOKIE, &synthetic_cookie()),
        }
        headers
    }
}

/// Deterministic provider for tests and scripted environments.
#[derive(Debug, Clone)]
pub struct StaticHeaderProvider {
    api: HeaderMap,
    media: HeaderMap,
}

impl StaticHeaderProvider {
    /// Creates a provider returning exactly the given header sets.
    #[must_use]
    pub fn new(api: HeaderMap, media: HeaderMap) -> Self {
        Self { api, media }
    }
}

impl Default for StaticHeaderProvider {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(STATIC_USER_AGENT));
        Self::new(headers.clone(), headers)
    }
}

impl HeaderProvider for StaticHeaderProvider {
    fn api_headers(&self) -> HeaderMap {
        self.api.clone()
    }

    fn media_headers(&self, _item: &MediaItem) -> HeaderMap {
        self.media.clone()
    }
}

fn random_user_agent() -> &'static str {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(STATIC_USER_AGENT)
}

/// Builds an anonymous visitor cookie with randomized device tokens.
fn synthetic_cookie() -> String {
    let mut rng = rand::thread_rng();
    let buvid3: u32 = rng.gen_range(100_000..=999_999);
    let buvid_fp: u32 = rng.gen_range(100_000..=999_999);
    let sid: u32 = rng.gen_range(100_000..=999_999);
    format!("buvid3={buvid3}; buvid_fp={buvid_fp}; CURRENT_FNVAL=4048; sid={sid}")
}

fn insert_dynamic(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => debug!(header = %name, "skipping header with invalid value"),
    }
}

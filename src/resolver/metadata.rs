//! Metadata resolution: references to concrete [`MediaItem`]s.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use super::api::{ViewData, ViewResponse};
use super::error::ResolveError;
use crate::config::DownloaderConfig;
use crate::download::{DownloadError, HttpClient};
use crate::headers::HeaderProvider;
use crate::media::MediaItem;
use crate::parser::ItemReference;

/// Path of the video metadata endpoint below the API root.
const VIEW_PATH: &str = "/x/web-interface/view";

/// Looks up sub-unit ids and titles from the platform's metadata endpoint.
///
/// Each call issues exactly one unretried GET.
pub struct MetadataResolver {
    client: HttpClient,
    headers: Arc<dyn HeaderProvider>,
    api_root: String,
}

impl MetadataResolver {
    /// Creates a resolver using the API client settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Fetch`] if the HTTP client cannot be built.
    pub fn new(
        config: &DownloaderConfig,
        headers: Arc<dyn HeaderProvider>,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: HttpClient::for_api(config)?,
            headers,
            api_root: config.api_root().to_string(),
        })
    }

    /// Points the resolver at a different API root (for testing with wiremock).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_root = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolves sub-unit `sub_index` (1-based) of `base_id`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotFound`] if `sub_index` is zero or exceeds the
    ///   number of sub-units
    /// - [`ResolveError::Upstream`] on an error status or malformed body
    /// - [`ResolveError::Fetch`] if the request itself fails
    #[instrument(skip(self), fields(bvid = %base_id))]
    pub async fn resolve_single(
        &self,
        base_id: &str,
        sub_index: u32,
    ) -> Result<MediaItem, ResolveError> {
        let data = self.fetch_view(base_id).await?;
        let available = data.pages.len();

        let (offset, page) = usize::try_from(sub_index)
            .ok()
            .and_then(|index| index.checked_sub(1))
            .and_then(|offset| data.pages.get(offset).map(|page| (offset, page)))
            .ok_or_else(|| ResolveError::not_found(base_id, sub_index, available))?;

        let item = MediaItem::new(base_id, page.cid.to_string(), data.page_title(offset));
        info!(cid = %item.stream_id, title = %item.title, "resolved item");
        Ok(item)
    }

    /// Resolves a parsed reference; a reference without a sub-index selects the first sub-unit.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_single`](Self::resolve_single).
    pub async fn resolve_reference(
        &self,
        reference: &ItemReference,
    ) -> Result<MediaItem, ResolveError> {
        self.resolve_single(reference.base_id(), reference.effective_sub_index())
            .await
    }

    /// Maps each reference to exactly one item, preserving input order.
    ///
    /// # Errors
    ///
    /// Fails on the first reference that cannot be resolved.
    #[instrument(skip(self, references), fields(count = references.len()))]
    pub async fn resolve_batch(
        &self,
        references: &[ItemReference],
    ) -> Result<Vec<MediaItem>, ResolveError> {
        let mut items = Vec::with_capacity(references.len());
        for reference in references {
            items.push(self.resolve_reference(reference).await?);
        }
        Ok(items)
    }

    /// Returns one item per sub-unit of `base_id`, in platform order.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Upstream`] on an error status, malformed body or an
    ///   empty sub-unit list
    /// - [`ResolveError::Fetch`] if the request itself fails
    #[instrument(skip(self), fields(bvid = %base_id))]
    pub async fn resolve_all_sub_units(
        &self,
        base_id: &str,
    ) -> Result<Vec<MediaItem>, ResolveError> {
        let data = self.fetch_view(base_id).await?;
        if data.pages.is_empty() {
            return Err(ResolveError::upstream(base_id, "video lists no sub-units"));
        }

        let items: Vec<MediaItem> = data
            .pages
            .iter()
            .enumerate()
            .map(|(offset, page)| {
                MediaItem::new(base_id, page.cid.to_string(), data.page_title(offset))
            })
            .collect();

        info!(count = items.len(), "resolved all sub-units");
        Ok(items)
    }

    async fn fetch_view(&self, base_id: &str) -> Result<ViewData, ResolveError> {
        let url = Url::parse_with_params(
            &format!("{}{VIEW_PATH}", self.api_root),
            &[("bvid", base_id)],
        )
        .map_err(|_| DownloadError::invalid_url(&self.api_root))?;

        debug!(api_url = %url, "requesting video metadata");
        let response = self
            .client
            .get(url.as_str(), self.headers.api_headers())
            .await
            .map_err(|e| match e {
                DownloadError::HttpStatus { status, .. } => {
                    ResolveError::upstream(base_id, format!("metadata endpoint returned HTTP {status}"))
                }
                other => ResolveError::Fetch(other),
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        let parsed: ViewResponse = serde_json::from_slice(&body)
            .map_err(|e| ResolveError::upstream(base_id, format!("malformed metadata body: {e}")))?;

        if parsed.code != 0 {
            return Err(ResolveError::upstream(
                base_id,
                format!("platform error code {}: {}", parsed.code, parsed.message),
            ));
        }
        parsed
            .data
            .ok_or_else(|| ResolveError::upstream(base_id, "metadata response has no data"))
    }
}

impl fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

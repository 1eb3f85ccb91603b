//! Platform API response shapes.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payload is ignored.

use serde::Deserialize;

/// Envelope of `GET /x/web-interface/view`.
#[derive(Debug, Deserialize)]
pub(crate) struct ViewResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<ViewData>,
}

/// Video metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct ViewData {
    pub title: String,
    pub pages: Vec<ViewPage>,
}

impl ViewData {
    /// Title used as the file stem for the page at `offset` (0-based).
    ///
    /// A single-page video uses the video title. In a multi-page video each
    /// page uses its own name, or the video title plus its page number when
    /// the name is blank, so sibling pages never share a stem.
    pub fn page_title(&self, offset: usize) -> String {
        if self.pages.len() <= 1 {
            return self.title.clone();
        }
        match self.pages.get(offset) {
            Some(page) if !page.part.trim().is_empty() => page.part.clone(),
            _ => format!("{} p{}", self.title, offset + 1),
        }
    }
}

/// One sub-unit ("page") of a video.
#[derive(Debug, Deserialize)]
pub(crate) struct ViewPage {
    pub cid: u64,
    #[serde(default)]
    pub part: String,
}

/// Envelope of `GET /x/player/playurl`.
#[derive(Debug, Deserialize)]
pub(crate) struct PlayUrlResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<PlayUrlData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayUrlData {
    pub dash: Option<Dash>,
}

/// Separate audio/video representations, best quality first.
#[derive(Debug, Deserialize)]
pub(crate) struct Dash {
    pub audio: Option<Vec<Representation>>,
    pub video: Option<Vec<Representation>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Representation {
    #[serde(rename = "baseUrl", alias = "base_url")]
    pub base_url: String,
}

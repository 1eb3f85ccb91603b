//! Core media types shared by the resolver, download and merge stages.

use std::fmt;

/// One concrete downloadable sub-unit of a video.
///
/// Produced by the resolver and consumed read-only afterwards. `stream_id`
/// and `title` come from platform metadata and are never re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaItem {
    /// Public video identifier (`bvid`) shared by all sub-units.
    pub base_id: String,
    /// Platform-internal content identifier (`cid`) of this sub-unit.
    pub stream_id: String,
    /// Display title, used verbatim as the output filename stem.
    pub title: String,
}

impl MediaItem {
    /// Creates a new media item.
    #[must_use]
    pub fn new(
        base_id: impl Into<String>,
        stream_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            base_id: base_id.into(),
            stream_id: stream_id.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.title, self.base_id, self.stream_id)
    }
}

/// Elementary stream kind delivered separately by the playback endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    /// Audio-only representation.
    Audio,
    /// Video-only representation.
    Video,
}

impl StreamKind {
    /// Returns the stable lowercase label used in logs and JSON keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

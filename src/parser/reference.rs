//! Item reference parsing (`bvid`, `bvid_pN`, video page URLs).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::ParseError;

/// Length of a platform base identifier.
pub const BASE_ID_LENGTH: usize = 12;

/// Bare reference: base identifier, then an optional separator + `p`/`p=` marker + digits.
#[allow(clippy::expect_used)]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>[0-9A-Za-z]{12})(?:[_\-?&#/:](?:[pP]=?)?(?P<index>[0-9]+))?$")
        .expect("reference regex is valid") // Static pattern, safe to panic
});

/// A user-supplied reference to one sub-unit of a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemReference {
    base_id: String,
    sub_index: Option<u32>,
}

impl ItemReference {
    /// Creates a reference from an already-validated base identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if `base_id` is not a 12-character alphanumeric
    /// token or `sub_index` is zero.
    pub fn new(base_id: &str, sub_index: Option<u32>) -> Result<Self, ParseError> {
        validate_base_id(base_id)?;
        if sub_index == Some(0) {
            return Err(ParseError::sub_index(base_id, "sub-index must be positive"));
        }
        Ok(Self {
            base_id: base_id.to_string(),
            sub_index,
        })
    }

    /// Parses a reference string.
    ///
    /// Accepted forms:
    /// - `BV1xx411c7mD` (first sub-unit)
    /// - `BV1xx411c7mD_p2`, `BV1xx411c7mD?p=2`, `BV1xx411c7mD-2`
    /// - `https://www.bilibili.com/video/BV1xx411c7mD/?p=2`
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the input is empty, malformed, or carries a
    /// zero or overflowing sub-index.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return parse_video_url(trimmed);
        }

        let Some(captures) = REFERENCE_PATTERN.captures(trimmed) else {
            return Err(ParseError::malformed(
                trimmed,
                &format!("expected a {BASE_ID_LENGTH}-character identifier with an optional sub-index suffix"),
            ));
        };

        let base_id = &captures["base"];
        let sub_index = captures
            .name("index")
            .map(|m| parse_sub_index(trimmed, m.as_str()))
            .transpose()?;

        debug!(base_id, ?sub_index, "parsed item reference");
        Ok(Self {
            base_id: base_id.to_string(),
            sub_index,
        })
    }

    /// Returns the base identifier.
    #[must_use]
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Returns the explicit sub-index, if the reference carried one.
    #[must_use]
    pub fn sub_index(&self) -> Option<u32> {
        self.sub_index
    }

    /// Returns the sub-index to resolve (the first sub-unit when none was given).
    #[must_use]
    pub fn effective_sub_index(&self) -> u32 {
        self.sub_index.unwrap_or(1)
    }
}

impl fmt::Display for ItemReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_index {
            Some(index) => write!(f, "{}_p{index}", self.base_id),
            None => f.write_str(&self.base_id),
        }
    }
}

impl FromStr for ItemReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_base_id(base_id: &str) -> Result<(), ParseError> {
    if base_id.len() != BASE_ID_LENGTH {
        return Err(ParseError::malformed(
            base_id,
            &format!(
                "base identifier must be {BASE_ID_LENGTH} characters, got {}",
                base_id.len()
            ),
        ));
    }
    if !base_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ParseError::malformed(
            base_id,
            "base identifier must be alphanumeric",
        ));
    }
    Ok(())
}

fn parse_sub_index(input: &str, digits: &str) -> Result<u32, ParseError> {
    let index: u32 = digits
        .parse()
        .map_err(|_| ParseError::sub_index(input, "sub-index is too large"))?;
    if index == 0 {
        return Err(ParseError::sub_index(input, "sub-index must be positive"));
    }
    Ok(index)
}

fn parse_video_url(input: &str) -> Result<ItemReference, ParseError> {
    let url = Url::parse(input).map_err(|e| ParseError::malformed(input, &e.to_string()))?;

    let base_id = url
        .path_segments()
        .and_then(|mut segments| {
            segments
                .by_ref()
                .find(|segment| *segment == "video")
                .and_then(|_| segments.next())
        })
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| ParseError::malformed(input, "URL does not contain a /video/<bvid> path"))?;
    validate_base_id(base_id)?;

    let sub_index = url
        .query_pairs()
        .find(|(key, _)| key == "p")
        .map(|(_, value)| parse_sub_index(input, &value))
        .transpose()?;

    Ok(ItemReference {
        base_id: base_id.to_string(),
        sub_index,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_base_id() {
        let reference = ItemReference::parse("ABCDEFGHIJKL").unwrap();
        assert_eq!(reference.base_id(), "ABCDEFGHIJKL");
        assert_eq!(reference.sub_index(), None);
        assert_eq!(reference.effective_sub_index(), 1);
    }

    #[test]
    fn test_parse_underscore_p_suffix() {
        let reference = ItemReference::parse("ABCDEFGHIJKL_p2").unwrap();
        assert_eq!(reference.base_id(), "ABCDEFGHIJKL");
        assert_eq!(reference.sub_index(), Some(2));
    }

    #[test]
    fn test_parse_accepts_common_separators() {
        for input in [
            "BV1xx411c7mD?p=3",
            "BV1xx411c7mD-3",
            "BV1xx411c7mD_3",
            "BV1xx411c7mD#p3",
            "BV1xx411c7mD/3",
        ] {
            let reference = ItemReference::parse(input).unwrap();
            assert_eq!(reference.base_id(), "BV1xx411c7mD", "input: {input}");
            assert_eq!(reference.sub_index(), Some(3), "input: {input}");
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let reference = ItemReference::parse("  BV1xx411c7mD \n").unwrap();
        assert_eq!(reference.base_id(), "BV1xx411c7mD");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(ItemReference::parse("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_rejects_short_identifier() {
        let result = ItemReference::parse("BV1xx411");
        assert!(matches!(result, Err(ParseError::InvalidReference { .. })));
    }

    #[test]
    fn test_parse_rejects_zero_sub_index() {
        let result = ItemReference::parse("BV1xx411c7mD_p0");
        assert!(matches!(result, Err(ParseError::InvalidSubIndex { .. })));
    }

    #[test]
    fn test_parse_rejects_overflowing_sub_index() {
        let result = ItemReference::parse("BV1xx411c7mD_p99999999999");
        assert!(matches!(result, Err(ParseError::InvalidSubIndex { .. })));
    }

    #[test]
    fn test_parse_rejects_suffix_without_separator() {
        // 13 alphanumerics: the extra character is not a recognised suffix
        let result = ItemReference::parse("BV1xx411c7mD2");
        assert!(matches!(result, Err(ParseError::InvalidReference { .. })));
    }

    #[test]
    fn test_parse_video_url_with_page_query() {
        let reference =
            ItemReference::parse("https://www.bilibili.com/video/BV1xx411c7mD/?p=4&t=10").unwrap();
        assert_eq!(reference.base_id(), "BV1xx411c7mD");
        assert_eq!(reference.sub_index(), Some(4));
    }

    #[test]
    fn test_parse_video_url_without_page() {
        let reference = ItemReference::parse("https://m.bilibili.com/video/BV1xx411c7mD").unwrap();
        assert_eq!(reference.sub_index(), None);
    }

    #[test]
    fn test_parse_url_without_video_path_rejected() {
        let result = ItemReference::parse("https://www.bilibili.com/bangumi/play/ep1234");
        assert!(matches!(result, Err(ParseError::InvalidReference { .. })));
    }

    #[test]
    fn test_new_rejects_zero_index() {
        assert!(ItemReference::new("BV1xx411c7mD", Some(0)).is_err());
        assert!(ItemReference::new("BV1xx411c7mD", Some(1)).is_ok());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let reference = ItemReference::new("BV1xx411c7mD", Some(5)).unwrap();
        assert_eq!(reference.to_string(), "BV1xx411c7mD_p5");
        let parsed: ItemReference = reference.to_string().parse().unwrap();
        assert_eq!(parsed, reference);
    }
}

//! Artifact naming: title stem plus stream extension.
//!
//! Titles are used verbatim unless sanitization is switched on. A title that
//! still reads as a path (separators, `..`, an absolute root) is refused by
//! [`artifact_path`] rather than followed out of the destination directory.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::DownloadError;
use crate::media::MediaItem;

/// Builds `<title>.<extension>` for `item`.
///
/// With `sanitize`, path-hostile characters are replaced first. An empty
/// stem falls back to the item's stream id so the file is never hidden.
#[must_use]
pub fn media_file_name(item: &MediaItem, extension: &str, sanitize: bool) -> String {
    let stem = if sanitize {
        sanitize_title(&item.title)
    } else {
        item.title.clone()
    };
    let stem = if stem.trim().is_empty() {
        item.stream_id.clone()
    } else {
        stem
    };
    format!("{stem}.{extension}")
}

/// Joins `file_name` onto `dir`.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] unless `file_name` is exactly one plain path
/// component; nothing is created on disk in that case.
pub fn artifact_path(dir: &Path, file_name: &str) -> Result<PathBuf, DownloadError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(file_name)),
        _ => Err(DownloadError::io(
            file_name,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "title is a path, not a file name; enable title sanitization",
            ),
        )),
    }
}

/// Replaces characters that are invalid on common filesystems.
///
/// `/ \ : * ? " < > |` and control characters become `_`; a result that
/// would still be a dot segment has its dots replaced too.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

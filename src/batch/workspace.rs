//! Scoped temporary workspace for combined-mode downloads.

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use super::error::BatchError;

/// Prefix of every workspace directory name.
const WORKSPACE_PREFIX: &str = "bilidown-";

/// Directory holding both stream files of every item until they are merged.
///
/// Owned by exactly one batch run. Dropping it removes the directory on a
/// best-effort basis; [`close`](Self::close) removes it and reports failures.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// Creates a fresh workspace under `parent`, or the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Workspace`] if `parent` or the workspace cannot be created.
    pub fn create(parent: Option<&Path>) -> Result<Self, BatchError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| BatchError::workspace(parent, e))?;
                builder
                    .tempdir_in(parent)
                    .map_err(|e| BatchError::workspace(parent, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| BatchError::workspace(std::env::temp_dir(), e))?,
        };

        debug!(path = %dir.path().display(), "created temporary workspace");
        Ok(Self { dir })
    }

    /// Returns the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the workspace recursively.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Workspace`] if removal fails.
    pub fn close(self) -> Result<(), BatchError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| BatchError::workspace(&path, e))?;
        debug!(path = %path.display(), "removed temporary workspace");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_created_under_parent_and_removed_on_close() {
        let parent = tempfile::TempDir::new().unwrap();
        let workspace = TempWorkspace::create(Some(parent.path())).unwrap();
        let path = workspace.path().to_path_buf();

        assert!(path.starts_with(parent.path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(WORKSPACE_PREFIX)
        );
        std::fs::write(path.join("a.mp4"), b"v").unwrap();

        workspace.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_workspace_creates_missing_parent() {
        let root = tempfile::TempDir::new().unwrap();
        let parent = root.path().join("not").join("yet");
        let workspace = TempWorkspace::create(Some(&parent)).unwrap();
        assert!(workspace.path().is_dir());
    }

    #[test]
    fn test_workspace_removed_on_drop() {
        let workspace = TempWorkspace::create(None).unwrap();
        let path = workspace.path().to_path_buf();
        drop(workspace);
        assert!(!path.exists());
    }
}

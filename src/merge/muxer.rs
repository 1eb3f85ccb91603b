//! External multiplexer invocation.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::error::MergeError;
use crate::config::DownloaderConfig;

/// Largest stderr tail kept in [`MergeError::Failed`].
const STDERR_TAIL_BYTES: usize = 2048;

/// Combines one video and one audio elementary stream into a container.
///
/// Implementations must not re-encode.
#[async_trait]
pub trait Muxer: Send + Sync + fmt::Debug {
    /// Fails fast if the tool cannot run at all.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Spawn`] if the tool is not available.
    fn ensure_available(&self) -> Result<(), MergeError>;

    /// Writes `output` from `video` + `audio`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Spawn`] if the tool cannot start and
    /// [`MergeError::Failed`] if it exits unsuccessfully.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError>;
}

/// Runs `ffmpeg` (or a compatible program) with stream copy.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl FfmpegMuxer {
    /// Creates a muxer invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Creates the muxer configured by `muxer_program`.
    #[must_use]
    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(config.muxer_program.clone())
    }

    /// Returns the configured program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds `-y -i <video> -i <audio> -codec copy <output>`.
    ///
    /// `-y` keeps an existing output from blocking on an interactive prompt.
    #[must_use]
    pub fn args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        vec![
            OsString::from("-y"),
            OsString::from("-i"),
            video.as_os_str().to_os_string(),
            OsString::from("-i"),
            audio.as_os_str().to_os_string(),
            OsString::from("-codec"),
            OsString::from("copy"),
            output.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    fn ensure_available(&self) -> Result<(), MergeError> {
        which::which(&self.program)
            .map(|resolved| debug!(program = %resolved.display(), "multiplexer found"))
            .map_err(|e| MergeError::spawn(&self.program, e.to_string()))
    }

    #[instrument(skip(self), fields(program = %self.program.display(), output = %output.display()))]
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        let result = Command::new(&self.program)
            .args(Self::args(video, audio, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MergeError::spawn(&self.program, e.to_string()))?;

        if result.status.success() {
            debug!("multiplexer finished");
            return Ok(());
        }

        let stderr = stderr_tail(&result.stderr);
        warn!(code = ?result.status.code(), %stderr, "multiplexer failed");
        Err(MergeError::Failed {
            program: self.program.clone(),
            output: output.to_path_buf(),
            code: result.status.code(),
            stderr,
        })
    }
}

/// Keeps the last [`STDERR_TAIL_BYTES`] of `stderr`, on a char boundary.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

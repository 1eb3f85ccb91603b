//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use bilidown_core::DownloadMode;
use bilidown_core::config::MAX_CONCURRENCY;

/// Batch download bilibili audio and video streams.
///
/// `audio` and `video` save one elementary stream per item; `all` downloads
/// both and muxes them with ffmpeg without re-encoding.
#[derive(Parser, Debug)]
#[command(name = "bilidown")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read defaults from this file instead of the standard location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to download.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download audio streams only
    Audio(DownloadArgs),
    /// Download video streams only
    Video(DownloadArgs),
    /// Download both streams and merge them
    All(DownloadArgs),
}

impl Command {
    /// Returns the batch mode for this subcommand.
    #[must_use]
    pub fn mode(&self) -> DownloadMode {
        match self {
            Self::Audio(_) => DownloadMode::AudioOnly,
            Self::Video(_) => DownloadMode::VideoOnly,
            Self::All(_) => DownloadMode::Combined,
        }
    }

    /// Returns the shared download arguments.
    #[must_use]
    pub fn download_args(&self) -> &DownloadArgs {
        match self {
            Self::Audio(args) | Self::Video(args) | Self::All(args) => args,
        }
    }
}

/// Arguments shared by every download subcommand.
#[derive(ClapArgs, Debug, Clone)]
pub struct DownloadArgs {
    /// Video reference: a bvid, optionally with a sub-index (BV1xx411c7mD_p2)
    #[arg(long, value_name = "REF")]
    pub bvid: String,

    /// Output directory (created if missing)
    #[arg(long, value_name = "DIR")]
    pub save: PathBuf,

    /// Download every sub-unit of the video instead of a single one
    #[arg(long)]
    pub list: bool,

    /// Retries after a failed metadata or location request (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: Option<u8>,

    /// Items processed at the same time (1-16)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=MAX_CONCURRENCY as i64))]
    pub concurrency: Option<u8>,

    /// Keep going after a failed item and report all failures at the end
    #[arg(long)]
    pub keep_going: bool,

    /// Cookie header value sent with every request
    #[arg(long, value_name = "TOKEN")]
    pub cookie: Option<String>,

    /// Multiplexer executable used by `all`
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Parent directory of the temporary workspace used by `all`
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Replace characters that are invalid in file names
    #[arg(long)]
    pub sanitize: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["bilidown"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_cli_audio_subcommand_parses_required_args() {
        let args = parse(&["audio", "--bvid", "BV1xx411c7mD", "--save", "out"]).unwrap();
        assert_eq!(args.command.mode(), DownloadMode::AudioOnly);
        let download = args.command.download_args();
        assert_eq!(download.bvid, "BV1xx411c7mD");
        assert_eq!(download.save, PathBuf::from("out"));
        assert!(!download.list);
        assert!(download.max_retries.is_none());
        assert!(download.concurrency.is_none());
    }

    #[test]
    fn test_cli_subcommands_map_to_modes() {
        let video = parse(&["video", "--bvid", "x", "--save", "o"]).unwrap();
        assert_eq!(video.command.mode(), DownloadMode::VideoOnly);
        let all = parse(&["all", "--bvid", "x", "--save", "o", "--list"]).unwrap();
        assert_eq!(all.command.mode(), DownloadMode::Combined);
        assert!(all.command.download_args().list);
    }

    #[test]
    fn test_cli_missing_bvid_is_error() {
        let err = parse(&["audio", "--save", "out"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_missing_subcommand_is_error() {
        let err = parse(&[]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_cli_verbose_flag_is_global() {
        let args = parse(&["-v", "audio", "--bvid", "x", "--save", "o"]).unwrap();
        assert_eq!(args.verbose, 1);
        let args = parse(&["audio", "--bvid", "x", "--save", "o", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = parse(&["--quiet", "video", "--bvid", "x", "--save", "o"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = parse(&["all", "--bvid", "x", "--save", "o", "-c", "16"]).unwrap();
        assert_eq!(args.command.download_args().concurrency, Some(16));

        let err = parse(&["all", "--bvid", "x", "--save", "o", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let err = parse(&["all", "--bvid", "x", "--save", "o", "-c", "17"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_max_retries_bounds() {
        let args = parse(&["audio", "--bvid", "x", "--save", "o", "-r", "0"]).unwrap();
        assert_eq!(args.command.download_args().max_retries, Some(0));

        let err = parse(&["audio", "--bvid", "x", "--save", "o", "-r", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_optional_overrides() {
        let args = parse(&[
            "all",
            "--bvid",
            "BV1xx411c7mD_p2",
            "--save",
            "o",
            "--keep-going",
            "--cookie",
            "SESSDATA=abc",
            "--ffmpeg",
            "/opt/ffmpeg",
            "--temp-dir",
            "/tmp/work",
            "--sanitize",
            "--config",
            "cfg.toml",
        ])
        .unwrap();
        let download = args.command.download_args();
        assert!(download.keep_going);
        assert!(download.sanitize);
        assert_eq!(download.cookie.as_deref(), Some("SESSDATA=abc"));
        assert_eq!(download.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(download.temp_dir, Some(PathBuf::from("/tmp/work")));
        assert_eq!(args.config, Some(PathBuf::from("cfg.toml")));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = parse(&["--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}

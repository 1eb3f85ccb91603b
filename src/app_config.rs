//! File configuration and its merge with CLI flags and the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bilidown_core::config::MAX_CONCURRENCY;
use bilidown_core::{DownloaderConfig, FailurePolicy};

use crate::cli::DownloadArgs;

/// Environment variable holding the cookie when neither flag nor file sets one.
pub const COOKIE_ENV: &str = "BILIDOWN_COOKIE";

/// `key = value` file configuration for downloader defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Cookie header value.
    pub cookie: Option<String>,
    /// Attempt budget for metadata and location requests.
    pub max_attempts: Option<u32>,
    /// Worker-pool size.
    pub concurrency: Option<usize>,
    /// Continue after failed items.
    pub keep_going: Option<bool>,
    /// Multiplexer executable.
    pub ffmpeg: Option<PathBuf>,
    /// Parent directory of the temporary workspace.
    pub temp_dir: Option<PathBuf>,
    /// Audio artifact extension.
    pub audio_extension: Option<String>,
    /// Video artifact extension.
    pub video_extension: Option<String>,
    /// Metadata/location request timeout.
    pub request_timeout_secs: Option<u64>,
    /// Media stall timeout.
    pub media_read_timeout_secs: Option<u64>,
    /// Replace path-hostile characters in titles.
    pub sanitize_titles: Option<bool>,
    /// Platform API root.
    pub api_base_url: Option<String>,
    /// `false` disables every politeness and retry delay.
    pub politeness: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(attempts) = self.max_attempts
            && !(1..=11).contains(&attempts)
        {
            bail!("Invalid config value for `max_attempts`: {attempts}. Expected range: 1..=11");
        }
        if let Some(concurrency) = self.concurrency
            && !(1..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: 1..={MAX_CONCURRENCY}"
            );
        }
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout_secs("media_read_timeout_secs", self.media_read_timeout_secs)?;
        validate_extension("audio_extension", self.audio_extension.as_deref())?;
        validate_extension("video_extension", self.video_extension.as_deref())?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_extension(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.is_empty() || value.contains(['.', '/', '\\']) {
        bail!("Invalid config value for `{field}`: '{value}'. Expected a bare extension like mp4");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bilidown/config.toml`
/// 2. `$HOME/.config/bilidown/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("bilidown")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bilidown")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` (which must exist) or the default file if present.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "cookie" => cfg.cookie = Some(parse_string_literal(value).with_context(context)?),
            "max_attempts" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.max_attempts = Some(u32::try_from(parsed).with_context(context)?);
            }
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.concurrency = Some(usize::try_from(parsed).with_context(context)?);
            }
            "keep_going" => cfg.keep_going = Some(parse_boolean(value).with_context(context)?),
            "ffmpeg" => {
                cfg.ffmpeg = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "temp_dir" => {
                cfg.temp_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "audio_extension" => {
                cfg.audio_extension = Some(parse_string_literal(value).with_context(context)?);
            }
            "video_extension" => {
                cfg.video_extension = Some(parse_string_literal(value).with_context(context)?);
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "media_read_timeout_secs" => {
                cfg.media_read_timeout_secs =
                    Some(parse_integer_u64(value).with_context(context)?);
            }
            "sanitize_titles" => {
                cfg.sanitize_titles = Some(parse_boolean(value).with_context(context)?);
            }
            "api_base_url" => {
                cfg.api_base_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "politeness" => cfg.politeness = Some(parse_boolean(value).with_context(context)?),
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Builds the runtime configuration.
///
/// Precedence: CLI flag > `BILIDOWN_COOKIE` (cookie only) > file > default.
pub fn build_config(
    args: &DownloadArgs,
    file: Option<&FileConfig>,
    env_cookie: Option<String>,
) -> Result<DownloaderConfig> {
    let file = file.cloned().unwrap_or_default();
    let mut config = DownloaderConfig::default();
    if file.politeness == Some(false) {
        config = config.without_delays();
    }
    if let Some(api_base_url) = file.api_base_url {
        config.api_base_url = api_base_url;
    }

    if let Some(retries) = args.max_retries {
        config.max_attempts = u32::from(retries) + 1;
    } else if let Some(attempts) = file.max_attempts {
        config.max_attempts = attempts;
    }

    if let Some(concurrency) = args.concurrency {
        config.concurrency = usize::from(concurrency);
    } else if let Some(concurrency) = file.concurrency {
        config.concurrency = concurrency;
    }

    let keep_going = args.keep_going || file.keep_going.unwrap_or(false);
    if keep_going {
        config.failure_policy = FailurePolicy::ContinueOnError;
    }

    config.cookie = args
        .cookie
        .clone()
        .or(env_cookie.filter(|c| !c.trim().is_empty()))
        .or(file.cookie);

    if let Some(program) = args.ffmpeg.clone().or(file.ffmpeg) {
        config.muxer_program = program;
    }
    config.temp_parent = args.temp_dir.clone().or(file.temp_dir);

    if let Some(ext) = file.audio_extension {
        config.audio_extension = ext;
    }
    if let Some(ext) = file.video_extension {
        config.video_extension = ext;
    }
    if let Some(secs) = file.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    config.media_read_timeout = file.media_read_timeout_secs.map(Duration::from_secs);
    config.sanitize_titles = args.sanitize || file.sanitize_titles.unwrap_or(false);

    config
        .validate()
        .context("Invalid downloader configuration")?;
    Ok(config)
}

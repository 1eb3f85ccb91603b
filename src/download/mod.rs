//! Resilient fetching, politeness delays and media persistence.
//!
//! This module provides the HTTP side of the pipeline:
//!
//! - [`HttpClient`]: pooled client with role-specific timeouts
//! - [`ResilientFetcher`]: bounded retries with a randomized wait, used for
//!   metadata and playback-info requests
//! - [`StreamPersister`]: single-shot streaming download of a media URL into
//!   a truncated destination file
//! - [`PolitenessGovernor`]: unconditional delays between requests and items
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use bilidown_core::{DownloaderConfig, HttpClient, MediaItem, StreamKind, StreamPersister};
//! use reqwest::header::HeaderMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloaderConfig::default();
//! let persister = StreamPersister::new(HttpClient::for_media(&config)?);
//! let item = MediaItem::new("BV1xx411c7mD", "1001", "Intro");
//! let outcome = persister
//!     .persist(&item, StreamKind::Audio, "https://cdn.example.com/a.m4s", Path::new("out/Intro.mp3"), HeaderMap::new())
//!     .await?;
//! println!("wrote {} bytes", outcome.bytes_written);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod fetcher;
pub mod filename;
mod persister;
mod politeness;
mod retry;

pub use client::HttpClient;
pub use constants::{CHUNK_SIZE, FULL_RANGE};
pub use error::DownloadError;
pub use fetcher::ResilientFetcher;
pub use filename::{artifact_path, media_file_name, sanitize_title};
pub use persister::{DownloadOutcome, StreamPersister};
pub use politeness::PolitenessGovernor;
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.

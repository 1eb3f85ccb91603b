//! Bilidown Core Library
//!
//! This library provides the fetch, resolve, download and merge pipeline
//! behind the `bilidown` tool, which batch-downloads the audio and/or video
//! streams of bilibili videos and optionally muxes them into one file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Single configuration value threaded through every component
//! - [`parser`] - Parsing of user-supplied item references (`bvid` + sub-index)
//! - [`headers`] - Injectable per-request header provider
//! - [`resolver`] - Metadata resolution and playback stream location
//! - [`download`] - Resilient fetching, politeness delays and stream persistence
//! - [`merge`] - External multiplexer invocation for audio/video pairs
//! - [`batch`] - Batch orchestration with a bounded worker pool
//! - [`app`] - High-level entry point wiring all of the above together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod batch;
pub mod config;
pub mod download;
pub mod headers;
pub mod media;
pub mod merge;
pub mod parser;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use app::{AppError, DownloadRequest, Downloader};
pub use batch::{
    BatchError, BatchEvent, BatchJob, BatchOrchestrator, BatchReport, DownloadMode, ItemError,
    ItemFailure,
};
pub use config::{ConfigError, DelayWindow, DownloaderConfig, FailurePolicy};
pub use download::{
    DownloadError, DownloadOutcome, HttpClient, PolitenessGovernor, ResilientFetcher,
    RetryPolicy, StreamPersister,
};
pub use headers::{BrowserHeaderProvider, HeaderProvider, StaticHeaderProvider};
pub use media::{MediaItem, StreamKind};
pub use merge::{FfmpegMuxer, MergeError, MergeJob, Merger, Muxer};
pub use parser::{ItemReference, ParseError};
pub use resolver::{MetadataResolver, ResolveError, StreamLocator};

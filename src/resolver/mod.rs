//! Reference resolution and playback stream location.
//!
//! Two components talk to the platform API here:
//!
//! - [`MetadataResolver`] - turns references into [`MediaItem`](crate::MediaItem)s
//!   (base id, stream id, title) with one unretried metadata request each
//! - [`StreamLocator`] - asks the playback-info endpoint for the direct URL of
//!   an item's audio or video stream, through the retrying fetcher
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bilidown_core::{
//!     BrowserHeaderProvider, DownloaderConfig, ItemReference, MetadataResolver, StreamKind,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DownloaderConfig::default();
//! let headers = Arc::new(BrowserHeaderProvider::from_config(&config)?);
//! let resolver = MetadataResolver::new(&config, headers)?;
//!
//! let reference = ItemReference::parse("BV1xx411c7mD_p2")?;
//! let item = resolver.resolve_reference(&reference).await?;
//! println!("{item}");
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod locator;
mod metadata;

pub use error::ResolveError;
pub use locator::StreamLocator;
pub use metadata::MetadataResolver;

//! Parsing of user-supplied item references.
//!
//! A reference names one sub-unit of a video: the 12-character base
//! identifier (`bvid`), optionally followed by a separator and a 1-based
//! sub-index. Full video page URLs are accepted as well.
//!
//! # Example
//!
//! ```
//! use bilidown_core::parser::ItemReference;
//!
//! let reference = ItemReference::parse("BV1xx411c7mD_p2").unwrap();
//! assert_eq!(reference.base_id(), "BV1xx411c7mD");
//! assert_eq!(reference.sub_index(), Some(2));
//! ```

mod error;
mod reference;

pub use error::ParseError;
pub use reference::{BASE_ID_LENGTH, ItemReference};

//! Constants for the download module (streaming and range requests).

/// Size of each write issued while streaming a media body (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Byte range sent with every media request; downloads always restart at 0.
pub const FULL_RANGE: &str = "bytes=0-";

/// Longest Retry-After value echoed into logs.
pub const MAX_LOGGED_RETRY_AFTER_LEN: usize = 64;

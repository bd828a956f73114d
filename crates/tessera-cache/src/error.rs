#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used by `tessera-cache`.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors produced by the byte cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("write out of bounds: offset {offset} + {len} bytes exceeds size {size}")]
    OutOfBounds { offset: u64, len: usize, size: u64 },

    #[error("resource of {0} bytes does not fit in memory on this platform")]
    TooLarge(u64),
}

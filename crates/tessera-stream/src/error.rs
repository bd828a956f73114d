#![forbid(unsafe_code)]

use std::io;

use tessera_cache::CacheError;
use tessera_net::NetError;
use thiserror::Error;

/// Errors produced by `tessera-stream`.
///
/// Notes:
/// - `Net` covers transport failures; reads never retry them.
/// - `Incomplete` is a range response that ended before the requested length.
/// - `InvalidSeek` is a seek that resolves to a negative position. It is never clamped.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Net(#[from] NetError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("incomplete transfer: expected {expected} bytes, received {received}")]
    Incomplete { expected: usize, received: usize },

    #[error("invalid seek position")]
    InvalidSeek,

    #[error("probe failed: {0}")]
    Probe(String),
}

impl SourceError {
    /// The `SourceError` carried by an `io::Error` produced by this crate.
    #[must_use]
    pub fn from_io(error: &io::Error) -> Option<&SourceError> {
        error.get_ref()?.downcast_ref::<SourceError>()
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidSeek => io::ErrorKind::InvalidInput,
            Self::Incomplete { .. } => io::ErrorKind::UnexpectedEof,
            Self::Net(NetError::Timeout) => io::ErrorKind::TimedOut,
            Self::Net(_) | Self::Cache(_) | Self::Probe(_) => io::ErrorKind::Other,
        }
    }
}

impl From<SourceError> for io::Error {
    fn from(error: SourceError) -> Self {
        io::Error::new(error.io_kind(), error)
    }
}

/// Result type for `tessera-stream`.
pub type SourceResult<T> = Result<T, SourceError>;

/// A range fetch that failed part way.
///
/// `received` bytes at the front of the destination buffer are valid and the
/// source cursor has already moved past them.
#[derive(Debug, Error)]
#[error("{source} (after {received} bytes)")]
pub struct FetchError {
    pub received: usize,
    #[source]
    pub source: SourceError,
}

impl FetchError {
    #[must_use]
    pub fn new(received: usize, source: SourceError) -> Self {
        Self { received, source }
    }
}

impl From<FetchError> for io::Error {
    fn from(error: FetchError) -> Self {
        error.source.into()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::invalid_seek(SourceError::InvalidSeek, io::ErrorKind::InvalidInput)]
    #[case::incomplete(
        SourceError::Incomplete { expected: 10, received: 4 },
        io::ErrorKind::UnexpectedEof
    )]
    #[case::timeout(SourceError::Net(NetError::Timeout), io::ErrorKind::TimedOut)]
    #[case::transport(SourceError::Net(NetError::http("reset")), io::ErrorKind::Other)]
    fn test_io_kind(#[case] error: SourceError, #[case] kind: io::ErrorKind) {
        let io_err: io::Error = error.into();
        assert_eq!(io_err.kind(), kind);
        assert!(SourceError::from_io(&io_err).is_some());
    }

    #[test]
    fn test_from_io_roundtrip_keeps_variant() {
        let io_err: io::Error = SourceError::Incomplete {
            expected: 1000,
            received: 400,
        }
        .into();
        assert!(matches!(
            SourceError::from_io(&io_err),
            Some(SourceError::Incomplete {
                expected: 1000,
                received: 400
            })
        ));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new(400, SourceError::Net(NetError::Timeout));
        assert_eq!(err.to_string(), "network error: Timeout (after 400 bytes)");
    }

    #[test]
    fn test_from_io_on_foreign_error() {
        let io_err = io::Error::other("plain");
        assert!(SourceError::from_io(&io_err).is_none());
    }

    #[test]
    fn test_source_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SourceError>();
        assert_send_sync::<FetchError>();
    }
}

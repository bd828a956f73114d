use tessera_cache::CacheError;
use tessera_net::NetError;
use tessera_stream::SourceError;
use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Net(#[from] NetError),

    #[error("probe failed: {0}")]
    Source(#[from] SourceError),

    #[error("cannot allocate cache: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServeResult<T> = Result<T, ServeError>;

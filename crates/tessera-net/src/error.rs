use thiserror::Error;

/// Failures talking to the origin.
///
/// `Clone` so the retry layer can hand back the last attempt's error.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    /// Request or body transfer failed after the connection was up.
    #[error("transfer failed: {0}")]
    Http(String),

    /// Could not reach the origin at all.
    #[error("cannot connect: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("origin answered {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// A non-zero range start was answered with the whole resource.
    #[error("origin ignored the range request for {url}")]
    RangeIgnored { url: String },

    #[error("gave up after {max_retries} retries: {source}")]
    RetryExhausted {
        max_retries: u32,
        source: Box<NetError>,
    },
}

impl NetError {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Whether another attempt could succeed: connection trouble, timeouts,
    /// 5xx, 408 and 429. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout => true,
            Self::HttpStatus { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Http(_) | Self::RangeIgnored { .. } | Self::RetryExhausted { .. } => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::RetryExhausted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::RetryExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else {
            Self::Http(error.to_string())
        }
    }
}

pub type NetResult<T> = Result<T, NetError>;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use url::Url;

use crate::{
    error::NetError,
    retry::{DefaultRetryClassifier, RetryNet},
    types::{Headers, RangeSpec, RetryPolicy},
};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetError>> + Send>>;

#[async_trait]
pub trait Net: Send + Sync {
    /// Get a range of bytes from a URL.
    ///
    /// Implementations must fail with [`NetError::RangeIgnored`] when the
    /// server answers a non-zero `range.start` with the whole resource.
    async fn get_range(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<ByteStream, NetError>;

    /// Response headers of a HEAD request.
    async fn head(&self, url: Url, headers: Option<Headers>) -> Result<Headers, NetError>;

    /// Response headers of a ranged GET; the body is dropped unread.
    ///
    /// For origins that refuse HEAD. A `206` answer carries `Content-Range`,
    /// a `200` answer is returned as is.
    async fn get_headers(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<Headers, NetError>;
}

pub trait NetExt: Net + Sized {
    /// Add retry layer
    fn with_retry(self, policy: RetryPolicy) -> RetryNet<Self, DefaultRetryClassifier> {
        RetryNet::new(self, policy)
    }
}

impl<T: Net> NetExt for T {}

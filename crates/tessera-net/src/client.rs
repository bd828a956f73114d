use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use tracing::trace;
use url::Url;

use crate::{
    error::{NetError, NetResult},
    traits::{ByteStream, Net},
    types::{Headers, NetOptions, RangeSpec},
};

/// `reqwest`-backed [`Net`]. Cloning shares the connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
    options: NetOptions,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`NetError`] if the underlying `reqwest::Client` cannot be built.
    pub fn new(options: NetOptions) -> NetResult<Self> {
        let inner = Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .build()?;
        Ok(Self { inner, options })
    }

    pub fn options(&self) -> &NetOptions {
        &self.options
    }

    /// Send with the configured timeout and any extra headers.
    async fn send(&self, mut req: RequestBuilder, extra: Option<Headers>) -> NetResult<Response> {
        for (name, value) in extra.iter().flat_map(Headers::iter) {
            req = req.header(name, value);
        }
        Ok(req.timeout(self.options.request_timeout).send().await?)
    }
}

#[async_trait]
impl Net for HttpClient {
    async fn get_range(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<ByteStream, NetError> {
        let value = range.to_header_value();
        trace!(%url, range = %value, "range request");

        let req = self.inner.get(url.clone()).header(header::RANGE, value);
        let resp = self.send(req, headers).await?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {}
            // A full body is usable only when it starts where we asked; the
            // reader stops consuming it once its buffer is full.
            StatusCode::OK if range.start == 0 => {}
            StatusCode::OK => return Err(NetError::RangeIgnored { url: url.into() }),
            status => return Err(NetError::http_status(status.as_u16(), url)),
        }

        Ok(Box::pin(resp.bytes_stream().map_err(NetError::from)))
    }

    async fn head(&self, url: Url, headers: Option<Headers>) -> Result<Headers, NetError> {
        let resp = self.send(self.inner.head(url.clone()), headers).await?;
        if !resp.status().is_success() {
            return Err(NetError::http_status(resp.status().as_u16(), url));
        }
        Ok(response_headers(&resp))
    }

    async fn get_headers(
        &self,
        url: Url,
        range: RangeSpec,
        headers: Option<Headers>,
    ) -> Result<Headers, NetError> {
        let value = range.to_header_value();
        trace!(%url, range = %value, "header-only range request");

        let req = self.inner.get(url.clone()).header(header::RANGE, value);
        let resp = self.send(req, headers).await?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT if !resp.headers().contains_key(header::CONTENT_RANGE) => {
                Err(NetError::http(format!("206 without Content-Range from {url}")))
            }
            StatusCode::PARTIAL_CONTENT | StatusCode::OK => Ok(response_headers(&resp)),
            status => Err(NetError::http_status(status.as_u16(), url)),
        }
    }
}

/// Headers with a text value, names lowercased.
fn response_headers(resp: &Response) -> Headers {
    resp.headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect()
}

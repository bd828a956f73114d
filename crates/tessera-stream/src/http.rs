#![forbid(unsafe_code)]

//! [`ByteSource`] over HTTP range requests.

use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

use futures::StreamExt;
use tessera_net::{Headers, HttpClient, Net, NetResult, RangeSpec};
use tokio::runtime::Handle;
use tracing::trace;
use url::Url;

use crate::{
    error::{FetchError, SourceError},
    probe::ResourceInfo,
    source::{ByteSource, resolve_seek},
};

/// Remote resource read through one HTTP range request per `fetch`.
///
/// Network calls are driven on the stored runtime handle and block the
/// calling thread, so an `HttpSource` must be used from outside the async
/// runtime (e.g. inside `tokio::task::spawn_blocking`).
pub struct HttpSource<N = HttpClient> {
    net: Arc<N>,
    info: Arc<ResourceInfo>,
    headers: Option<Headers>,
    runtime: Handle,
    pos: u64,
}

impl<N: Net + 'static> HttpSource<N> {
    #[must_use]
    pub fn new(net: Arc<N>, info: Arc<ResourceInfo>, runtime: Handle) -> Self {
        Self {
            net,
            info,
            headers: None,
            runtime,
            pos: 0,
        }
    }

    /// Extra headers sent with every range request.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn info(&self) -> &ResourceInfo {
        &self.info
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.info.url
    }
}

impl<N: Net + 'static> ByteSource for HttpSource<N> {
    fn len(&self) -> u64 {
        self.info.len
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, FetchError> {
        let remaining = self.info.len.saturating_sub(self.pos);
        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        if want == 0 {
            return Ok(0);
        }

        let range = RangeSpec::span(self.pos, want as u64);
        trace!(url = %self.info.url, range = %range.to_header_value(), "fetch");

        let (received, result) = self.runtime.block_on(download(
            &*self.net,
            self.info.url.clone(),
            range,
            self.headers.clone(),
            &mut buf[..want],
        ));
        self.pos += received as u64;

        match result {
            Err(e) => Err(FetchError::new(received, e.into())),
            Ok(()) if received < want => Err(FetchError::new(
                received,
                SourceError::Incomplete {
                    expected: want,
                    received,
                },
            )),
            Ok(()) => Ok(received),
        }
    }

    fn duplicate(&self) -> Self {
        Self {
            net: Arc::clone(&self.net),
            info: Arc::clone(&self.info),
            headers: self.headers.clone(),
            runtime: self.runtime.clone(),
            pos: 0,
        }
    }
}

impl<N: Net + 'static> Read for HttpSource<N> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fetch(buf).map_err(io::Error::from)
    }
}

impl<N: Net + 'static> Seek for HttpSource<N> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.info.len, pos)?;
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}

/// Stream one range response into `dst`, stopping once it is full.
///
/// Returns the bytes written alongside the outcome so a failed transfer still
/// reports its valid prefix.
async fn download<N: Net + ?Sized>(
    net: &N,
    url: Url,
    range: RangeSpec,
    headers: Option<Headers>,
    dst: &mut [u8],
) -> (usize, NetResult<()>) {
    let mut stream = match net.get_range(url, range, headers).await {
        Ok(stream) => stream,
        Err(e) => return (0, Err(e)),
    };

    let mut filled = 0;
    while filled < dst.len() {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let n = chunk.len().min(dst.len() - filled);
                dst[filled..filled + n].copy_from_slice(&chunk[..n]);
                filled += n;
            }
            Some(Err(e)) => return (filled, Err(e)),
            None => break,
        }
    }
    (filled, Ok(()))
}

//! Shared async HTTP test server helpers.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use url::Url;

/// Lightweight HTTP test server wrapper.
pub struct TestHttpServer {
    base_url: Url,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHttpServer {
    /// Spawn `router` on a random localhost port.
    ///
    /// # Panics
    ///
    /// Panics if listener bind or URL parsing fails.
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test HTTP listener");
        let addr = listener
            .local_addr()
            .expect("read test listener local addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.expect("run test HTTP server");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("parse base URL"),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Join path to server base URL.
    ///
    /// # Panics
    ///
    /// Panics if URL join fails.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("join server URL path")
    }

    /// Base URL of this server.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Misbehaviours a [`RangeFixture`] can simulate.
#[derive(Clone, Debug, Default)]
pub struct FixtureOptions {
    /// `Content-Disposition` sent with every response.
    pub disposition: Option<String>,
    /// Answer every GET with `200` and the whole body.
    pub ignore_range: bool,
    /// Send this many body bytes of a range response, then drop the connection.
    pub abort_after: Option<usize>,
    /// Send this many bytes fewer than requested, with a matching `Content-Length`.
    pub short_by: usize,
    /// Omit `Content-Length` on HEAD and answer GETs with the whole body at
    /// an undeclared size.
    pub hide_length: bool,
    /// Answer HEAD with `403`, like URLs presigned for GET only.
    pub reject_head: bool,
}

struct FixtureState {
    data: Bytes,
    options: FixtureOptions,
    gets: AtomicUsize,
    heads: AtomicUsize,
    ranges: Mutex<Vec<String>>,
}

/// Range-capable origin serving a fixed payload, counting every request.
#[derive(Clone)]
pub struct RangeFixture {
    state: Arc<FixtureState>,
}

impl RangeFixture {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_options(data, FixtureOptions::default())
    }

    #[must_use]
    pub fn with_options(data: impl Into<Bytes>, options: FixtureOptions) -> Self {
        Self {
            state: Arc::new(FixtureState {
                data: data.into(),
                options,
                gets: AtomicUsize::new(0),
                heads: AtomicUsize::new(0),
                ranges: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Router answering every path with the payload.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(serve_fixture)
            .with_state(Arc::clone(&self.state))
    }

    /// Spawn the fixture on a random port.
    pub async fn spawn(&self) -> TestHttpServer {
        TestHttpServer::new(self.router()).await
    }

    #[must_use]
    pub fn get_count(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn head_count(&self) -> usize {
        self.state.heads.load(Ordering::SeqCst)
    }

    /// `Range` header values received, in arrival order.
    #[must_use]
    pub fn range_headers(&self) -> Vec<String> {
        self.state.ranges.lock().clone()
    }
}

/// Inclusive `(start, end)` of a single `bytes=` range against `len`.
fn parse_range(value: &str, len: usize) -> Option<(usize, usize)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end = if end.is_empty() {
        len.checked_sub(1)?
    } else {
        end.parse::<usize>().ok()?.min(len.checked_sub(1)?)
    };
    (start <= end).then_some((start, end))
}

async fn serve_fixture(
    State(state): State<Arc<FixtureState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let len = state.data.len();

    let mut out = HeaderMap::new();
    if let Some(disposition) = &state.options.disposition {
        out.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(disposition).expect("valid disposition"),
        );
    }

    if method == Method::HEAD {
        state.heads.fetch_add(1, Ordering::SeqCst);
        if state.options.reject_head {
            return StatusCode::FORBIDDEN.into_response();
        }
        if state.options.hide_length {
            return (StatusCode::OK, out, unsized_body(Bytes::new())).into_response();
        }
        out.insert(header::CONTENT_LENGTH, len.into());
        return (StatusCode::OK, out).into_response();
    }

    state.gets.fetch_add(1, Ordering::SeqCst);
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if let Some(range) = &range {
        state.ranges.lock().push(range.clone());
    }

    if state.options.hide_length {
        return (StatusCode::OK, out, unsized_body(state.data.clone())).into_response();
    }

    let parsed = range
        .as_deref()
        .filter(|_| !state.options.ignore_range)
        .and_then(|r| parse_range(r, len));
    let Some((start, end)) = parsed else {
        return (StatusCode::OK, out, state.data.clone()).into_response();
    };

    let slice = state.data.slice(start..=end);
    out.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&format!("bytes {start}-{end}/{len}")).expect("valid range"),
    );

    if let Some(n) = state.options.abort_after {
        out.insert(header::CONTENT_LENGTH, slice.len().into());
        let head = slice.slice(..n.min(slice.len()));
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(head),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "fixture abort")),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));
        return (StatusCode::PARTIAL_CONTENT, out, body).into_response();
    }

    let delivered = slice.slice(..slice.len().saturating_sub(state.options.short_by));
    out.insert(header::CONTENT_LENGTH, delivered.len().into());
    (StatusCode::PARTIAL_CONTENT, out, delivered).into_response()
}

/// Streamed body, so axum cannot fill in `Content-Length`.
fn unsized_body(data: Bytes) -> Body {
    Body::from_stream(futures::stream::iter([Ok::<_, io::Error>(data)]))
}

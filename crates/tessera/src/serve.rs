//! HTTP front end: one fallback handler answering `GET`/`HEAD` for every
//! path with the cached resource.

use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
    time::SystemTime,
};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use httpdate::HttpDate;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tessera_cache::ByteCache;
use tessera_stream::{ByteSource, GapFillReader, HttpSource, LoggedStream};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    conditional::{self, Precondition},
    ranges::{self, Multipart, RangeRequest, Segment},
};

/// Size of each body chunk handed to the client.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the blocking reader and the response body.
const CHANNEL_DEPTH: usize = 4;

const OCTET_STREAM: &str = "application/octet-stream";

/// Characters allowed unescaped in an RFC 8187 extended header value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Shared per-resource state; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    root: HttpSource,
    cache: Arc<ByteCache>,
    disposition: HeaderValue,
    modified: HttpDate,
    last_modified: HeaderValue,
    prefetch_window: usize,
}

impl AppState {
    /// `modified` is reported as `Last-Modified`, truncated to whole seconds.
    #[must_use]
    pub fn new(
        root: HttpSource,
        cache: Arc<ByteCache>,
        prefetch_window: usize,
        modified: SystemTime,
    ) -> Self {
        let disposition = content_disposition(&root.info().name);
        let modified = HttpDate::from(modified);
        let last_modified = HeaderValue::from_str(&modified.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));
        Self {
            inner: Arc::new(Inner {
                root,
                cache,
                disposition,
                modified,
                last_modified,
                prefetch_window,
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.root.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.root.info().name
    }

    /// Modification time sent to clients, whole seconds.
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        self.inner.modified.into()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ByteCache> {
        &self.inner.cache
    }
}

/// Router serving the resource on every path.
pub fn router(state: AppState) -> Router {
    Router::new().fallback(serve_resource).with_state(state)
}

/// `attachment` disposition for `name`.
///
/// `filename` carries an ASCII rendering; names that need more also get an
/// RFC 8187 `filename*` with the exact UTF-8 name.
fn content_disposition(name: &str) -> HeaderValue {
    let mut fallback = String::with_capacity(name.len());
    let mut plain = true;
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(c);
            }
            c if c.is_ascii_graphic() || c == ' ' => fallback.push(c),
            _ => {
                plain = false;
                fallback.push('_');
            }
        }
    }

    let mut value = format!("attachment; filename=\"{fallback}\"");
    if !plain {
        value.push_str("; filename*=utf-8''");
        value.extend(utf8_percent_encode(name, ATTR_CHAR));
    }
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

async fn serve_resource(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        let mut out = HeaderMap::new();
        out.insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        return (StatusCode::METHOD_NOT_ALLOWED, out).into_response();
    }

    let len = state.len();
    let modified = state.inner.modified;

    let mut out = HeaderMap::new();
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    out.insert(header::LAST_MODIFIED, state.inner.last_modified.clone());

    match conditional::evaluate(&headers, modified) {
        Precondition::Proceed => {}
        Precondition::NotModified => {
            debug!(%method, "not modified");
            return (StatusCode::NOT_MODIFIED, out).into_response();
        }
        Precondition::Failed => {
            info!(%method, "precondition failed");
            return (StatusCode::PRECONDITION_FAILED, out).into_response();
        }
    }

    out.insert(header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    out.insert(header::CONTENT_DISPOSITION, state.inner.disposition.clone());

    let requested = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .filter(|_| conditional::range_applies(&headers, modified));

    let (status, segments) = match ranges::parse_range(requested, len) {
        RangeRequest::Full => (StatusCode::OK, vec![Segment::Span(0..len)]),
        RangeRequest::Single(span) => {
            out.insert(
                header::CONTENT_RANGE,
                header_value(ranges::content_range(&span, len)),
            );
            (StatusCode::PARTIAL_CONTENT, vec![Segment::Span(span)])
        }
        RangeRequest::Multi(spans) => {
            let parts = Multipart::new(spans, len, OCTET_STREAM, ranges::boundary());
            out.insert(header::CONTENT_TYPE, header_value(parts.content_type()));
            (StatusCode::PARTIAL_CONTENT, parts.into_segments())
        }
        RangeRequest::Unsatisfiable => {
            info!(%method, range = ?requested, len, "range not satisfiable");
            out.insert(header::CONTENT_RANGE, header_value(format!("bytes */{len}")));
            out.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
            return (StatusCode::RANGE_NOT_SATISFIABLE, out).into_response();
        }
    };

    let body_len: u64 = segments.iter().map(Segment::len).sum();
    info!(%method, range = ?requested, status = status.as_u16(), bytes = body_len, "serving");
    out.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));

    if method == Method::HEAD || body_len == 0 {
        return (status, out).into_response();
    }
    (status, out, stream_body(&state, segments)).into_response()
}

/// Values built here are plain ASCII.
fn header_value(value: String) -> HeaderValue {
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Response body fed by a blocking reader over the shared cache.
fn stream_body(state: &AppState, segments: Vec<Segment>) -> Body {
    let reader = GapFillReader::new(
        state.inner.root.duplicate(),
        Arc::clone(&state.inner.cache),
    )
    .with_prefetch_window(state.inner.prefetch_window);
    let reader = LoggedStream::with_label(reader, label(&segments));

    let (tx, mut rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || pump(reader, segments, &tx));

    Body::from_stream(async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield chunk;
        }
    })
}

/// `bytes a-b,c-d` over the spans of a body.
fn label(segments: &[Segment]) -> String {
    let spans: Vec<String> = segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Span(span) => Some(format!("{}-{}", span.start, span.end.saturating_sub(1))),
            Segment::Literal(_) => None,
        })
        .collect();
    format!("bytes {}", spans.join(","))
}

/// Copy `segments` into `tx`, reading spans from `reader` in [`CHUNK_SIZE`]
/// pieces.
///
/// Stops at the first error, forwarding it so the connection is torn down
/// instead of ending short and looking complete.
fn pump<R: Read + Seek>(mut reader: R, segments: Vec<Segment>, tx: &mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    for segment in segments {
        let span = match segment {
            Segment::Literal(bytes) => {
                if tx.blocking_send(Ok(bytes)).is_err() {
                    debug!("client went away");
                    return;
                }
                continue;
            }
            Segment::Span(span) => span,
        };

        if let Err(e) = reader.seek(SeekFrom::Start(span.start)) {
            let _ = tx.blocking_send(Err(e));
            return;
        }
        let mut remaining = span.end - span.start;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
            if let Err(e) = reader.read_exact(&mut buf[..want]) {
                let _ = tx.blocking_send(Err(e));
                return;
            }
            if tx
                .blocking_send(Ok(Bytes::copy_from_slice(&buf[..want])))
                .is_err()
            {
                debug!(remaining, "client went away");
                return;
            }
            remaining -= want as u64;
        }
    }
}

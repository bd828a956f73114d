//! `Range` header parsing and the body layout of partial responses.

use std::{
    ops::Range,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;

/// Outcome of a `Range` request header against a resource of known size.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RangeRequest {
    /// Absent or malformed, or asking for more bytes than the resource has:
    /// answer with the whole body.
    Full,
    /// One half-open byte span inside the resource.
    Single(Range<u64>),
    /// Several spans, served as `multipart/byteranges` in request order.
    Multi(Vec<Range<u64>>),
    Unsatisfiable,
}

/// One `first-last` element of a range set.
enum Spec {
    Span(Range<u64>),
    /// Well formed but starts past the end.
    Outside,
    Invalid,
}

pub(crate) fn parse_range(value: Option<&str>, len: u64) -> RangeRequest {
    let Some(set) = value.and_then(|v| v.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };

    let mut spans = Vec::new();
    let mut outside = false;
    for spec in set.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match parse_spec(spec, len) {
            Spec::Span(span) => spans.push(span),
            Spec::Outside => outside = true,
            Spec::Invalid => return RangeRequest::Full,
        }
    }

    let total = spans
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.end - s.start));
    if total > len {
        return RangeRequest::Full;
    }

    match spans.len() {
        0 if outside => RangeRequest::Unsatisfiable,
        0 => RangeRequest::Full,
        1 => RangeRequest::Single(spans.swap_remove(0)),
        _ => RangeRequest::Multi(spans),
    }
}

fn parse_spec(spec: &str, len: u64) -> Spec {
    let Some((first, last)) = spec.split_once('-') else {
        return Spec::Invalid;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix form: the final `n` bytes.
        let Ok(n) = last.parse::<u64>() else {
            return Spec::Invalid;
        };
        if n == 0 || len == 0 {
            return Spec::Outside;
        }
        return Spec::Span(len - n.min(len)..len);
    }

    let Ok(start) = first.parse::<u64>() else {
        return Spec::Invalid;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => Some(end),
            _ => return Spec::Invalid,
        }
    };

    if start >= len {
        return Spec::Outside;
    }
    let end = end.map_or(len - 1, |e| e.min(len - 1));
    Spec::Span(start..end + 1)
}

/// `bytes first-last/len` for a non-empty span.
pub(crate) fn content_range(span: &Range<u64>, len: u64) -> String {
    format!("bytes {}-{}/{len}", span.start, span.end - 1)
}

/// A piece of a response body: fixed bytes, or a span of the resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(Bytes),
    Span(Range<u64>),
}

impl Segment {
    pub(crate) fn len(&self) -> u64 {
        match self {
            Self::Literal(bytes) => bytes.len() as u64,
            Self::Span(span) => span.end - span.start,
        }
    }
}

/// Body of a `multipart/byteranges` response.
#[derive(Debug)]
pub(crate) struct Multipart {
    boundary: String,
    segments: Vec<Segment>,
}

impl Multipart {
    pub(crate) fn new(spans: Vec<Range<u64>>, len: u64, part_type: &str, boundary: String) -> Self {
        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        for (i, span) in spans.into_iter().enumerate() {
            let separator = if i == 0 { "" } else { "\r\n" };
            let head = format!(
                "{separator}--{boundary}\r\nContent-Type: {part_type}\r\nContent-Range: {}\r\n\r\n",
                content_range(&span, len)
            );
            segments.push(Segment::Literal(Bytes::from(head)));
            segments.push(Segment::Span(span));
        }
        segments.push(Segment::Literal(Bytes::from(format!("\r\n--{boundary}--\r\n"))));
        Self { boundary, segments }
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/byteranges; boundary={}", self.boundary)
    }

    pub(crate) fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

/// Boundary unique within this process.
pub(crate) fn boundary() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("tessera{nanos:08x}{seq:016x}")
}

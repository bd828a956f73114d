//! Conditional request headers checked against the resource's fixed
//! modification time. No entity tag is ever sent.

use axum::http::{HeaderMap, HeaderName, header};
use httpdate::HttpDate;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Precondition {
    Proceed,
    /// `304`.
    NotModified,
    /// `412`.
    Failed,
}

/// Evaluate `If-Unmodified-Since`, `If-None-Match` and `If-Modified-Since`,
/// in that order, for a `GET` or `HEAD`.
pub(crate) fn evaluate(headers: &HeaderMap, modified: HttpDate) -> Precondition {
    if let Some(since) = date(headers, &header::IF_UNMODIFIED_SINCE)
        && modified > since
    {
        return Precondition::Failed;
    }

    if let Some(tags) = text(headers, &header::IF_NONE_MATCH) {
        // Without a tag of our own only `*` can match.
        return if tags.trim() == "*" {
            Precondition::NotModified
        } else {
            Precondition::Proceed
        };
    }

    if let Some(since) = date(headers, &header::IF_MODIFIED_SINCE)
        && modified <= since
    {
        return Precondition::NotModified;
    }
    Precondition::Proceed
}

/// Whether a `Range` header still applies. `If-Range` must carry exactly
/// the modification time; an entity tag never matches.
pub(crate) fn range_applies(headers: &HeaderMap, modified: HttpDate) -> bool {
    match text(headers, &header::IF_RANGE) {
        None => true,
        Some(value) => value
            .trim()
            .parse::<HttpDate>()
            .is_ok_and(|date| date == modified),
    }
}

fn text<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Unparseable dates count as absent.
fn date(headers: &HeaderMap, name: &HeaderName) -> Option<HttpDate> {
    text(headers, name)?.trim().parse().ok()
}

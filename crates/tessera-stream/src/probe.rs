#![forbid(unsafe_code)]

//! One-shot metadata probe of a remote resource.

use percent_encoding::percent_decode_str;
use tessera_net::{Headers, Net, RangeSpec};
use tracing::debug;
use url::Url;

use crate::error::{SourceError, SourceResult};

const FALLBACK_NAME: &str = "download";

/// Immutable facts about a remote resource, discovered once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub url: Url,
    pub len: u64,
    /// Suggested display name.
    pub name: String,
}

impl ResourceInfo {
    #[must_use]
    pub fn new(url: Url, len: u64, name: impl Into<String>) -> Self {
        Self {
            url,
            len,
            name: name.into(),
        }
    }

    /// Replace the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Read the size and suggested name of a remote resource.
///
/// Asks with HEAD first. When HEAD is refused (`403`, `405`, `501`) or
/// answered without `Content-Length`, falls back to a GET of the first byte
/// and takes the size from `Content-Range`, or from `Content-Length` if the
/// origin sent the whole body.
///
/// # Errors
///
/// Returns [`SourceError::Net`] if the requests fail and
/// [`SourceError::Probe`] if no usable length comes back.
pub async fn probe<N: Net + ?Sized>(
    net: &N,
    url: &Url,
    headers: Option<Headers>,
) -> SourceResult<ResourceInfo> {
    let resp = match net.head(url.clone(), headers.clone()).await {
        Ok(resp) if resp.get("content-length").is_some() => resp,
        Ok(_) => {
            debug!(%url, "HEAD without Content-Length, asking with GET");
            net.get_headers(url.clone(), RangeSpec::span(0, 1), headers)
                .await?
        }
        Err(e) if matches!(e.status_code(), Some(403 | 405 | 501)) => {
            debug!(%url, error = %e, "HEAD refused, asking with GET");
            net.get_headers(url.clone(), RangeSpec::span(0, 1), headers)
                .await?
        }
        Err(e) => return Err(e.into()),
    };

    let len = resource_len(&resp, url)?;
    let name = resp
        .get("content-disposition")
        .and_then(disposition_filename)
        .or_else(|| name_from_url(url))
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    debug!(%url, len, name, "probed resource");
    Ok(ResourceInfo::new(url.clone(), len, name))
}

/// Complete length from `Content-Range`, else `Content-Length`.
fn resource_len(headers: &Headers, url: &Url) -> SourceResult<u64> {
    if let Some(range) = headers.get("content-range") {
        return complete_length(range)
            .ok_or_else(|| SourceError::Probe(format!("invalid Content-Range '{range}' for {url}")));
    }

    let content_length = headers
        .get("content-length")
        .ok_or_else(|| SourceError::Probe(format!("no Content-Length for {url}")))?;
    content_length.trim().parse::<u64>().map_err(|e| {
        SourceError::Probe(format!(
            "invalid Content-Length '{content_length}' for {url}: {e}"
        ))
    })
}

/// `len` of `bytes a-b/len`; `None` for `*` or anything malformed.
fn complete_length(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes ")?.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// `filename` parameter of a `Content-Disposition` value.
fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let val = val.trim();
        let val = val
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(val);
        (!val.is_empty()).then(|| val.to_string())
    })
}

/// Last non-empty path segment, percent-decoded.
fn name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

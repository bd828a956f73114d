#![forbid(unsafe_code)]

use std::io::{self, Read, Seek, SeekFrom};

use tracing::warn;

use crate::{error::FetchError, source::ByteSource};

/// Decorator that logs every failed seek or read of the wrapped stream.
///
/// Errors are passed through unchanged.
pub struct LoggedStream<S> {
    inner: S,
    label: String,
}

impl<S> LoggedStream<S> {
    pub fn new(inner: S) -> Self {
        Self::with_label(inner, "stream")
    }

    /// Wrap `inner`, tagging log records with `label`.
    pub fn with_label(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for LoggedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            warn!(label = %self.label, len = buf.len(), error = %e, "read error");
        })
    }
}

impl<S: Seek> Seek for LoggedStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos).inspect_err(|e| {
            warn!(label = %self.label, ?pos, error = %e, "seek error");
        })
    }
}

impl<S: ByteSource> ByteSource for LoggedStream<S> {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn position(&self) -> u64 {
        self.inner.position()
    }

    fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, FetchError> {
        let offset = self.inner.position();
        self.inner.fetch(buf).inspect_err(|e| {
            warn!(label = %self.label, offset, received = e.received, error = %e.source, "fetch error");
        })
    }

    fn duplicate(&self) -> Self {
        Self {
            inner: self.inner.duplicate(),
            label: self.label.clone(),
        }
    }
}

#![forbid(unsafe_code)]

//! Read-through reader that fills cache gaps from a [`ByteSource`].
//!
//! `GapFillReader<S>` implements `Read + Seek`. The cursor lives in the
//! source; the cache is shared with every other reader of the same resource.
//! On a miss it fetches the whole gap at the cursor, up to the prefetch
//! window, independent of the caller's buffer size. Whatever arrives is
//! cached, and only the requested prefix is handed back.

use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

use tessera_cache::ByteCache;
use tracing::{debug, trace};

use crate::{error::SourceError, source::ByteSource};

/// Default read-ahead per cache miss.
pub const PREFETCH_WINDOW: usize = 256 * 1024;

/// Sync reader serving bytes from a shared [`ByteCache`] and fetching gaps
/// from its own [`ByteSource`].
pub struct GapFillReader<S> {
    source: S,
    cache: Arc<ByteCache>,
    window: usize,
    scratch: Vec<u8>,
}

impl<S: ByteSource> GapFillReader<S> {
    /// Bind `source` to the shared `cache`.
    ///
    /// Both must describe the same resource.
    #[must_use]
    pub fn new(source: S, cache: Arc<ByteCache>) -> Self {
        debug_assert_eq!(source.len(), cache.len(), "source and cache length differ");
        Self {
            source,
            cache,
            window: PREFETCH_WINDOW,
            scratch: Vec::new(),
        }
    }

    /// Override the prefetch window. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_prefetch_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    #[must_use]
    pub fn prefetch_window(&self) -> usize {
        self.window
    }

    /// Current cursor.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ByteCache> {
        &self.cache
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn into_source(self) -> S {
        self.source
    }

    fn advance(&mut self, delta: i64) -> io::Result<()> {
        self.source.seek(SeekFrom::Current(delta)).map(|_| ())
    }

    fn fill_gap(&mut self, offset: u64, gap: usize, buf: &mut [u8]) -> io::Result<usize> {
        if self.scratch.len() < gap {
            self.scratch.resize(gap, 0);
        }

        let fetched = self.source.fetch(&mut self.scratch[..gap]);
        let received = match &fetched {
            Ok(n) => *n,
            Err(e) => e.received,
        };
        if received > 0 {
            self.cache
                .fill(offset, &self.scratch[..received])
                .map_err(SourceError::from)?;
        }

        let n = match fetched {
            Ok(0) => {
                // Source ended inside a range the cache expects to exist.
                self.source.seek(SeekFrom::Start(offset))?;
                return Err(SourceError::Incomplete {
                    expected: gap,
                    received: 0,
                }
                .into());
            }
            Ok(n) => n,
            Err(e) => {
                debug!(offset, gap, received, error = %e, "gap fetch failed");
                // Nothing reached the caller; a retry resumes from the cache.
                self.source.seek(SeekFrom::Start(offset))?;
                return Err(e.into());
            }
        };

        let take = n.min(buf.len());
        buf[..take].copy_from_slice(&self.scratch[..take]);
        if n > take {
            self.advance(-((n - take) as i64))?;
        }

        trace!(offset, gap, fetched = n, delivered = take, "cache miss");
        Ok(take)
    }
}

impl<S: ByteSource> Read for GapFillReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let offset = self.source.position();
        if offset >= self.source.len() {
            return Ok(0);
        }

        let gap = self.cache.gap_run(offset, self.window);
        if gap == 0 {
            let n = self.cache.read_into(offset, buf);
            self.advance(n as i64)?;
            trace!(offset, n, "cache hit");
            return Ok(n);
        }

        self.fill_gap(offset, gap, buf)
    }
}

impl<S: ByteSource> Seek for GapFillReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.source.seek(pos)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.source.position())
    }
}

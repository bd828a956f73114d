#![forbid(unsafe_code)]

//! Read-through byte cache shared by every reader of one resource.
//!
//! [`ByteCache`] owns a buffer sized exactly to the resource and a
//! [`PresenceMap`] of the same length. Queries take a shared lock, fills an
//! exclusive one. A fill writes the bytes and marks them present under the
//! same write guard, so a reader that sees a present bit also sees the byte.

use std::fmt;

use parking_lot::RwLock;
use tracing::trace;

use crate::{CacheError, CacheResult, PresenceMap};

struct CacheState {
    buf: Vec<u8>,
    present: PresenceMap,
}

/// Fixed-size sparse cache of a remote resource.
///
/// Created once per resource and shared behind an `Arc`. Never resized,
/// never cleared.
pub struct ByteCache {
    state: RwLock<CacheState>,
    len: u64,
}

impl fmt::Debug for ByteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteCache")
            .field("len", &self.len)
            .field("cached", &self.cached_bytes())
            .finish()
    }
}

impl ByteCache {
    /// Allocate a cache for a resource of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::TooLarge`] if `len` does not fit in `usize`.
    pub fn new(len: u64) -> CacheResult<Self> {
        let size = usize::try_from(len).map_err(|_| CacheError::TooLarge(len))?;
        Ok(Self {
            state: RwLock::new(CacheState {
                buf: vec![0; size],
                present: PresenceMap::new(size),
            }),
            len,
        })
    }

    /// Resource size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// In-bounds offset as a buffer index.
    fn index(&self, offset: u64) -> Option<usize> {
        if offset >= self.len {
            return None;
        }
        usize::try_from(offset).ok()
    }

    /// Length of the run of present bytes starting at `offset`, capped at
    /// `max_len`. Zero if `offset` is absent or past the end.
    #[must_use]
    pub fn available_run(&self, offset: u64, max_len: usize) -> usize {
        let Some(start) = self.index(offset) else {
            return 0;
        };
        self.state.read().present.run_len(start, max_len, true)
    }

    /// Length of the run of absent bytes starting at `offset`, capped at
    /// `max_len`. Zero if `offset` is present or past the end.
    #[must_use]
    pub fn gap_run(&self, offset: u64, max_len: usize) -> usize {
        let Some(start) = self.index(offset) else {
            return 0;
        };
        self.state.read().present.run_len(start, max_len, false)
    }

    /// Write `data` at `offset` and mark it present.
    ///
    /// Re-filling bytes that are already present is allowed; the resource is
    /// immutable, so the stored value does not change.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::OutOfBounds`] if the write would extend past the
    /// end of the resource. Nothing is written in that case.
    pub fn fill(&self, offset: u64, data: &[u8]) -> CacheResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let out_of_bounds = || CacheError::OutOfBounds {
            offset,
            len: data.len(),
            size: self.len,
        };
        let end = offset
            .checked_add(data.len() as u64)
            .filter(|&end| end <= self.len)
            .ok_or_else(out_of_bounds)?;
        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(end).map_err(|_| out_of_bounds())?;

        let mut state = self.state.write();
        state.buf[start..end].copy_from_slice(data);
        state.present.set_range(start..end);
        drop(state);

        trace!(offset, len = data.len(), "cache fill");
        Ok(())
    }

    /// Copy the present run at `offset` into `buf`, up to `buf.len()` bytes.
    ///
    /// Returns the number of bytes copied; zero when nothing is cached at
    /// `offset`. Never fetches.
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> usize {
        let Some(start) = self.index(offset) else {
            return 0;
        };

        let state = self.state.read();
        let n = state.present.run_len(start, buf.len(), true);
        buf[..n].copy_from_slice(&state.buf[start..start + n]);
        n
    }

    /// Number of bytes currently cached.
    #[must_use]
    pub fn cached_bytes(&self) -> u64 {
        self.state.read().present.count_set() as u64
    }

    /// Whether every byte of the resource is cached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.read().present.is_complete()
    }
}

//! In-memory `ByteSource` for testing readers without a network.

use std::{
    io::{self, Read, Seek, SeekFrom},
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;
use tessera_net::NetError;
use tessera_stream::{ByteSource, FetchError, SourceError, resolve_seek};

/// Fault injected into every fetch that overlaps `range`.
#[derive(Clone, Debug)]
pub struct Fault {
    /// Offsets whose fetch misbehaves.
    pub range: Range<u64>,
    /// Bytes delivered before the failure.
    pub deliver: usize,
    /// `true`: the body just ends short. `false`: transport error.
    pub short_body: bool,
}

struct Shared {
    data: Vec<u8>,
    fetches: AtomicUsize,
    fetched_bytes: AtomicUsize,
    requests: Mutex<Vec<Range<u64>>>,
    fault: Option<Fault>,
}

/// In-memory source that counts every fetch.
///
/// Duplicates share the data and counters but not the cursor.
pub struct MemorySource {
    shared: Arc<Shared>,
    pos: u64,
}

impl MemorySource {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self::build(data, None)
    }

    /// Source whose fetches touching `fault.range` fail after `fault.deliver` bytes.
    #[must_use]
    pub fn with_fault(data: Vec<u8>, fault: Fault) -> Self {
        Self::build(data, Some(fault))
    }

    fn build(data: Vec<u8>, fault: Option<Fault>) -> Self {
        Self {
            shared: Arc::new(Shared {
                data,
                fetches: AtomicUsize::new(0),
                fetched_bytes: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                fault,
            }),
            pos: 0,
        }
    }

    /// Fetches issued by this source and all its duplicates.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    /// Bytes delivered by all fetches.
    #[must_use]
    pub fn fetched_bytes(&self) -> usize {
        self.shared.fetched_bytes.load(Ordering::SeqCst)
    }

    /// Requested ranges, in issue order.
    #[must_use]
    pub fn requests(&self) -> Vec<Range<u64>> {
        self.shared.requests.lock().clone()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.shared.data
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.shared.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn fetch(&mut self, buf: &mut [u8]) -> Result<usize, FetchError> {
        let start = self.pos as usize;
        let want = buf.len().min(self.shared.data.len().saturating_sub(start));
        if want == 0 {
            return Ok(0);
        }

        let range = self.pos..self.pos + want as u64;
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        self.shared.requests.lock().push(range.clone());

        let fault = self
            .shared
            .fault
            .as_ref()
            .filter(|f| f.range.start < range.end && range.start < f.range.end);
        let n = fault.map_or(want, |f| f.deliver.min(want));

        buf[..n].copy_from_slice(&self.shared.data[start..start + n]);
        self.pos += n as u64;
        self.shared.fetched_bytes.fetch_add(n, Ordering::SeqCst);

        match fault {
            None => Ok(n),
            Some(f) if f.short_body && n == want => Ok(n),
            Some(f) if f.short_body => Err(FetchError::new(
                n,
                SourceError::Incomplete {
                    expected: want,
                    received: n,
                },
            )),
            Some(_) => Err(FetchError::new(
                n,
                SourceError::Net(NetError::http("connection reset by peer")),
            )),
        }
    }

    fn duplicate(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            pos: 0,
        }
    }
}

impl Read for MemorySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fetch(buf).map_err(io::Error::from)
    }
}

impl Seek for MemorySource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = resolve_seek(self.pos, self.len(), pos)?;
        Ok(self.pos)
    }
}

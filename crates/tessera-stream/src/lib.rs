#![forbid(unsafe_code)]

//! `tessera-stream`
//!
//! Seekable read-through access to a remote resource.
//!
//! ## Pieces
//! - [`ByteSource`]: remote view with a private cursor, one range request per fetch
//! - [`HttpSource`]: `ByteSource` over [`tessera_net::Net`]
//! - [`GapFillReader`]: `Read + Seek` serving from a shared [`tessera_cache::ByteCache`]
//!   and fetching missing runs with read-ahead
//! - [`LoggedStream`]: logging decorator for any of the above
//! - [`probe`]: size and name discovery before serving starts
//!
//! One cache per resource, one reader per request:
//!
//! ```ignore
//! let info = Arc::new(probe(&net, &url, None).await?);
//! let cache = Arc::new(ByteCache::new(info.len)?);
//! let root = HttpSource::new(Arc::new(client), info, Handle::current());
//!
//! // per request, on a blocking thread
//! let mut reader = GapFillReader::new(root.duplicate(), Arc::clone(&cache));
//! reader.seek(SeekFrom::Start(500))?;
//! reader.read_exact(&mut buf)?;
//! ```

mod error;
mod http;
mod logged;
mod probe;
mod reader;
mod source;

pub use error::{FetchError, SourceError, SourceResult};
pub use http::HttpSource;
pub use logged::LoggedStream;
pub use probe::{ResourceInfo, probe};
pub use reader::{GapFillReader, PREFETCH_WINDOW};
pub use source::{ByteSource, resolve_seek};

#![forbid(unsafe_code)]

//! `tessera-cache`
//!
//! In-memory cache primitives for tessera:
//! - [`PresenceMap`]: one bit per byte offset, set once and never cleared
//! - [`ByteCache`]: fixed-size buffer plus presence map behind a `RwLock`

mod cache;
mod error;
mod presence;

pub use cache::ByteCache;
pub use error::{CacheError, CacheResult};
pub use presence::PresenceMap;

#![forbid(unsafe_code)]

//! Shared test utilities for the tessera workspace.

pub mod fixtures;
pub mod http_server;
pub mod memory_source;
pub mod rng;

pub use fixtures::{payload, payload_at};
pub use http_server::{FixtureOptions, RangeFixture, TestHttpServer};
pub use memory_source::{Fault, MemorySource};
pub use rng::Xorshift64;

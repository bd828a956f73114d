#![forbid(unsafe_code)]

//! `tessera-net`
//!
//! HTTP transport for tessera: range GETs and HEAD probes behind the [`Net`]
//! trait, with an optional retry layer.

mod client;
mod error;
mod retry;
mod traits;
mod types;

pub use crate::{
    client::HttpClient,
    error::{NetError, NetResult},
    retry::{DefaultRetryClassifier, RetryClassifier, RetryNet},
    traits::{ByteStream, Net, NetExt},
    types::{Headers, NetOptions, RangeSpec, RetryPolicy},
};

#![forbid(unsafe_code)]

//! `tessera`
//!
//! Serves one slow remote HTTP resource locally with full range support.
//! Every request gets its own reader; all readers share one read-through
//! cache, so each remote byte is fetched at most once while it is needed.

mod cli;
mod conditional;
mod config;
mod error;
mod ranges;
mod serve;

use std::{sync::Arc, time::SystemTime};

use tessera_cache::ByteCache;
use tessera_net::{HttpClient, NetExt};
use tessera_stream::{HttpSource, probe};
use tokio::{net::TcpListener, runtime::Handle};
use tracing::info;

pub use cli::Cli;
pub use config::ServeConfig;
pub use error::{ServeError, ServeResult};
pub use serve::{AppState, CHUNK_SIZE, router};

/// Probe the origin and build the shared serving state.
///
/// The resource is reported as last modified at the moment it was opened.
///
/// Must be called from inside a multi-threaded tokio runtime; readers later
/// block on its handle from worker threads.
///
/// # Errors
///
/// Fails if the HTTP client cannot be built, the probe fails after its
/// retries, or the cache cannot be allocated.
pub async fn open(config: &ServeConfig) -> ServeResult<AppState> {
    let client = HttpClient::new(config.net.clone())?;

    let prober = client.clone().with_retry(config.net.retry_policy.clone());
    let mut info = probe(&prober, &config.url, None).await?;
    if let Some(name) = &config.filename {
        info = info.with_name(name.clone());
    }

    let cache = Arc::new(ByteCache::new(info.len)?);
    let modified = SystemTime::now();
    info!(url = %info.url, len = info.len, name = %info.name, "resource ready");

    let root = HttpSource::new(Arc::new(client), Arc::new(info), Handle::current());
    Ok(AppState::new(
        root,
        cache,
        config.prefetch_window,
        modified,
    ))
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Fails if [`open`] fails or the listener cannot be bound.
pub async fn run(config: ServeConfig) -> ServeResult<()> {
    let state = open(&config).await?;

    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %listener.local_addr()?, name = %state.name(), "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutting down"),
                // No signal handler: run until killed.
                Err(_) => std::future::pending().await,
            }
        })
        .await?;
    Ok(())
}

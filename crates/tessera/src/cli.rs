use std::net::SocketAddr;

use clap::Parser;
use url::Url;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "tessera",
    about = "Serve a remote HTTP resource locally with range support and a shared cache",
    long_about = None,
    version,
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Remote resource to serve (must support HTTP range requests)
    #[arg(value_name = "URL")]
    pub url: Url,

    /// Local address to listen on
    #[arg(short, long, value_name = "ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// File name offered to clients instead of the probed one
    #[arg(short, long, value_name = "NAME")]
    pub filename: Option<String>,

    /// Bytes fetched ahead on every cache miss
    #[arg(long, value_name = "BYTES", default_value_t = 262_144)]
    pub prefetch: usize,

    /// Per-request timeout towards the origin, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Retries for the startup probe
    #[arg(long, value_name = "N", default_value_t = 3)]
    pub retries: u32,
}

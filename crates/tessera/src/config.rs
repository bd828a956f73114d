use std::{net::SocketAddr, time::Duration};

use tessera_net::{NetOptions, RetryPolicy};
use url::Url;

use crate::{
    cli::Cli,
    error::{ServeError, ServeResult},
};

/// Validated server settings.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub url: Url,
    pub addr: SocketAddr,
    /// Overrides the probed display name.
    pub filename: Option<String>,
    pub prefetch_window: usize,
    pub net: NetOptions,
}

impl ServeConfig {
    /// Settings with defaults for everything but the origin URL.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            filename: None,
            prefetch_window: tessera_stream::PREFETCH_WINDOW,
            net: NetOptions::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ServeError::Config`] for a non-HTTP URL, a zero prefetch
    /// window, a zero timeout or an empty file name.
    pub fn from_cli(cli: Cli) -> ServeResult<Self> {
        if !matches!(cli.url.scheme(), "http" | "https") {
            return Err(ServeError::Config(format!(
                "unsupported URL scheme '{}'",
                cli.url.scheme()
            )));
        }
        if cli.prefetch == 0 {
            return Err(ServeError::Config("prefetch must be at least 1 byte".into()));
        }
        if cli.timeout == 0 {
            return Err(ServeError::Config("timeout must be at least 1 second".into()));
        }
        if cli.filename.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ServeError::Config("filename must not be empty".into()));
        }

        let net = NetOptions {
            request_timeout: Duration::from_secs(cli.timeout),
            retry_policy: RetryPolicy {
                max_retries: cli.retries,
                ..RetryPolicy::default()
            },
            ..NetOptions::default()
        };

        Ok(Self {
            url: cli.url,
            addr: cli.addr,
            filename: cli.filename,
            prefetch_window: cli.prefetch,
            net,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rstest::rstest;

    use super::*;

    fn parse(args: &[&str]) -> ServeResult<ServeConfig> {
        let cli = Cli::try_parse_from(std::iter::once("tessera").chain(args.iter().copied()))
            .map_err(|e| ServeError::Config(e.to_string()))?;
        ServeConfig::from_cli(cli)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["http://origin/file.bin"]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.prefetch_window, 262_144);
        assert_eq!(config.net.request_timeout, Duration::from_secs(30));
        assert_eq!(config.net.retry_policy.max_retries, 3);
        assert!(config.filename.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "https://origin/a",
            "--addr",
            "127.0.0.1:9000",
            "--filename",
            "movie.mkv",
            "--prefetch",
            "1024",
            "--timeout",
            "5",
            "--retries",
            "0",
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.filename.as_deref(), Some("movie.mkv"));
        assert_eq!(config.prefetch_window, 1024);
        assert_eq!(config.net.request_timeout, Duration::from_secs(5));
        assert_eq!(config.net.retry_policy.max_retries, 0);
    }

    #[rstest]
    #[case::scheme(&["ftp://origin/a"])]
    #[case::zero_prefetch(&["http://origin/a", "--prefetch", "0"])]
    #[case::zero_timeout(&["http://origin/a", "--timeout", "0"])]
    #[case::blank_name(&["http://origin/a", "--filename", " "])]
    #[case::bad_url(&["not a url"])]
    #[case::bad_addr(&["http://origin/a", "--addr", "nowhere"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(matches!(parse(args), Err(ServeError::Config(_))));
    }
}

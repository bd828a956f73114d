use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use rstest::*;
use tessera_net::{ByteStream, Headers, Net, NetError, NetExt, RangeSpec, RetryPolicy};
use url::Url;

// Fails `failures` times with `error`, then succeeds.
#[derive(Clone)]
struct FlakyNet {
    failures: usize,
    calls: Arc<AtomicUsize>,
    error: NetError,
}

impl FlakyNet {
    fn new(failures: usize, error: NetError) -> Self {
        Self {
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
            error,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn attempt(&self) -> Result<(), NetError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(self.error.clone())
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Net for FlakyNet {
    async fn get_range(
        &self,
        _url: Url,
        _range: RangeSpec,
        _headers: Option<Headers>,
    ) -> Result<ByteStream, NetError> {
        self.attempt()?;
        let stream = futures::stream::iter(vec![Ok::<_, NetError>(Bytes::from("success"))]);
        Ok(Box::pin(stream))
    }

    async fn head(&self, _url: Url, _headers: Option<Headers>) -> Result<Headers, NetError> {
        self.attempt()?;
        let mut headers = Headers::new();
        headers.insert("content-length", "7");
        Ok(headers)
    }

    async fn get_headers(
        &self,
        _url: Url,
        _range: RangeSpec,
        _headers: Option<Headers>,
    ) -> Result<Headers, NetError> {
        self.attempt()?;
        Ok([("content-range", "bytes 0-0/7")].into_iter().collect())
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(5))
}

fn url() -> Url {
    Url::parse("http://example.com/file.bin").unwrap()
}

#[rstest]
#[case::no_failures(0)]
#[case::one_failure(1)]
#[case::three_failures(3)]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_head_succeeds_after_retries(#[case] failures: usize) {
    let mock = FlakyNet::new(failures, NetError::Timeout);
    let net = mock.clone().with_retry(fast_policy(3));

    let headers = net.head(url(), None).await.unwrap();

    assert_eq!(headers.get("content-length"), Some("7"));
    assert_eq!(mock.calls(), failures + 1);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_retries_exhausted() {
    let mock = FlakyNet::new(10, NetError::http_status(503, "http://example.com/"));
    let net = mock.clone().with_retry(fast_policy(2));

    let error = net.head(url(), None).await.unwrap_err();

    match error {
        NetError::RetryExhausted {
            max_retries,
            source,
        } => {
            assert_eq!(max_retries, 2);
            assert_eq!(source.status_code(), Some(503));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mock.calls(), 3);
}

#[rstest]
#[case::not_found(NetError::http_status(404, "http://example.com/"))]
#[case::range_ignored(NetError::RangeIgnored { url: "http://example.com/".into() })]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_non_retryable_fails_once(#[case] error: NetError) {
    let mock = FlakyNet::new(10, error.clone());
    let net = mock.clone().with_retry(fast_policy(3));

    let result = net.get_range(url(), RangeSpec::span(0, 7), None).await;

    match result {
        Err(e) => assert_eq!(e.to_string(), error.to_string()),
        Ok(_) => panic!("expected failure"),
    }
    assert_eq!(mock.calls(), 1);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn test_get_headers_retries_server_errors() {
    let mock = FlakyNet::new(2, NetError::http_status(502, "http://example.com/"));
    let net = mock.clone().with_retry(fast_policy(3));

    let headers = net
        .get_headers(url(), RangeSpec::span(0, 1), None)
        .await
        .unwrap();

    assert_eq!(headers.get("Content-Range"), Some("bytes 0-0/7"));
    assert_eq!(mock.calls(), 3);
}

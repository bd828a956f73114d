use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use futures::TryStreamExt;
use rstest::*;
use tessera_net::{ByteStream, HttpClient, Net, NetError, NetOptions, RangeSpec};
use tessera_test_utils::{
    FixtureOptions, RangeFixture, TestHttpServer, payload, payload_at,
};

#[fixture]
fn client() -> HttpClient {
    HttpClient::new(NetOptions::default()).unwrap()
}

async fn collect(stream: ByteStream) -> Result<Vec<u8>, NetError> {
    stream
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
}

#[rstest]
#[case::head_of_file(0, 100)]
#[case::middle(5_000, 1_234)]
#[case::tail(9_990, 10)]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_range_returns_requested_bytes(
    client: HttpClient,
    #[case] start: u64,
    #[case] len: u64,
) {
    let fixture = RangeFixture::new(payload(10_000));
    let server = fixture.spawn().await;

    let stream = client
        .get_range(server.url("/a.bin"), RangeSpec::span(start, len), None)
        .await
        .unwrap();
    let body = collect(stream).await.unwrap();

    assert_eq!(body, payload_at(start as usize, len as usize));
    assert_eq!(
        fixture.range_headers(),
        vec![format!("bytes={}-{}", start, start + len - 1)]
    );
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_range_rejects_ignored_range(client: HttpClient) {
    let fixture = RangeFixture::with_options(
        payload(4_096),
        FixtureOptions {
            ignore_range: true,
            ..FixtureOptions::default()
        },
    );
    let server = fixture.spawn().await;

    let result = client
        .get_range(server.url("/a.bin"), RangeSpec::span(100, 10), None)
        .await;

    assert!(matches!(result, Err(NetError::RangeIgnored { .. })));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_range_accepts_full_body_from_zero(client: HttpClient) {
    let fixture = RangeFixture::with_options(
        payload(4_096),
        FixtureOptions {
            ignore_range: true,
            ..FixtureOptions::default()
        },
    );
    let server = fixture.spawn().await;

    let stream = client
        .get_range(server.url("/a.bin"), RangeSpec::span(0, 10), None)
        .await
        .unwrap();
    let body = collect(stream).await.unwrap();

    // The whole body arrives; the caller keeps only what it asked for.
    assert_eq!(body[..10], payload(10)[..]);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_range_http_status_error(client: HttpClient) {
    let router = Router::new().route("/missing", get(|| async { StatusCode::NOT_FOUND }));
    let server = TestHttpServer::new(router).await;

    let result = client
        .get_range(server.url("/missing"), RangeSpec::span(0, 10), None)
        .await;

    match result {
        Err(e) => assert_eq!(e.status_code(), Some(404)),
        Ok(_) => panic!("expected 404"),
    }
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_range_aborted_body_surfaces_error(client: HttpClient) {
    let fixture = RangeFixture::with_options(
        payload(10_000),
        FixtureOptions {
            abort_after: Some(300),
            ..FixtureOptions::default()
        },
    );
    let server = fixture.spawn().await;

    let mut stream = client
        .get_range(server.url("/a.bin"), RangeSpec::span(0, 1_000), None)
        .await
        .unwrap();

    let mut received = Vec::new();
    let error = loop {
        match stream.try_next().await {
            Ok(Some(chunk)) => received.extend_from_slice(&chunk),
            Ok(None) => panic!("body ended without error"),
            Err(e) => break e,
        }
    };

    assert!(matches!(error, NetError::Http(_)));
    assert!(received.len() <= 300);
    assert_eq!(received, payload(received.len()));
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_head_reports_length_and_disposition(client: HttpClient) {
    let fixture = RangeFixture::with_options(
        payload(12_345),
        FixtureOptions {
            disposition: Some("attachment; filename=\"movie.mkv\"".into()),
            ..FixtureOptions::default()
        },
    );
    let server = fixture.spawn().await;

    let headers = client.head(server.url("/a.bin"), None).await.unwrap();

    assert_eq!(headers.get("content-length"), Some("12345"));
    assert_eq!(
        headers.get("content-disposition"),
        Some("attachment; filename=\"movie.mkv\"")
    );
    assert_eq!(fixture.head_count(), 1);
    assert_eq!(fixture.get_count(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_get_headers_skips_the_body(client: HttpClient) {
    let fixture = RangeFixture::new(payload(12_345));
    let server = fixture.spawn().await;

    let headers = client
        .get_headers(server.url("/a.bin"), RangeSpec::span(0, 1), None)
        .await
        .unwrap();

    assert_eq!(headers.get("content-range"), Some("bytes 0-0/12345"));
    assert_eq!(headers.get("content-length"), Some("1"));
    assert_eq!(fixture.range_headers(), vec!["bytes=0-0".to_string()]);
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn test_head_refusal_keeps_its_status(client: HttpClient) {
    let fixture = RangeFixture::with_options(
        payload(10),
        FixtureOptions {
            reject_head: true,
            ..FixtureOptions::default()
        },
    );
    let server = fixture.spawn().await;

    let err = client.head(server.url("/a.bin"), None).await.unwrap_err();

    assert_eq!(err.status_code(), Some(403));
    assert!(!err.is_retryable());
}

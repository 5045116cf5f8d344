//! TransportClient retry behaviour against a mock HTTP server.
//!
//! The blocking client must not be created or dropped on an async worker
//! thread, so every request runs inside `spawn_blocking`.

use std::{
    net::TcpListener,
    time::{Duration, Instant},
};

use vidgrab::{RetryPolicy, TransportClient, TransportOptions, VidgrabError, transport::parse_retry_after};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn client_with_backoff(max_retries: u32, factor: Duration) -> TransportClient {
    let policy = RetryPolicy::new()
        .with_max_retries(max_retries)
        .with_backoff_factor(factor);
    TransportClient::new(&TransportOptions::new().with_retry_policy(policy)).unwrap()
}

fn fast_client(max_retries: u32) -> TransportClient {
    client_with_backoff(max_retries, Duration::from_millis(1))
}

/// Issue one GET through a fresh client and return the final status code.
async fn get_status(url: String, max_retries: u32) -> Result<u16, VidgrabError> {
    tokio::task::spawn_blocking(move || {
        fast_client(max_retries)
            .get(&url)
            .map(|response| response.status().as_u16())
    })
    .await
    .unwrap()
}

// ── retry masking ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn retryable_status_is_masked_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(4)
        .with_priority(1)
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let status = get_status(format!("{}/flaky", server.uri()), 5).await.unwrap();
    assert_eq!(status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_budget_reports_final_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = get_status(format!("{}/down", server.uri()), 5).await;
    match result {
        Err(VidgrabError::HttpStatus {
            status, attempts, ..
        }) => {
            assert_eq!(status, 500);
            assert_eq!(attempts, 6);
        }
        other => panic!("Expected HttpStatus, got: {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6, "1 attempt + 5 retries");
}

#[tokio::test(flavor = "multi_thread")]
async fn non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    match get_status(format!("{}/missing", server.uri()), 5).await {
        Err(VidgrabError::HttpStatus {
            status, attempts, ..
        }) => {
            assert_eq!(status, 404);
            assert_eq!(attempts, 1);
        }
        other => panic!("Expected HttpStatus, got: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_retries_reports_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let result = get_status(format!("{}/gateway", server.uri()), 0).await;
    assert!(matches!(
        result,
        Err(VidgrabError::HttpStatus {
            status: 502,
            attempts: 1,
            ..
        })
    ));
}

// ── Retry-After ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn retry_after_overrides_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    let (status, elapsed) = tokio::task::spawn_blocking(move || {
        // A one-minute computed backoff that Retry-After: 0 must replace.
        let policy = RetryPolicy::new().with_backoff_factor(Duration::from_secs(60));
        let client =
            TransportClient::new(&TransportOptions::new().with_retry_policy(policy)).unwrap();
        let started = Instant::now();
        let status = client.get(&url).unwrap().status().as_u16();
        (status, started.elapsed())
    })
    .await
    .unwrap();

    assert_eq!(status, 200);
    assert!(elapsed < Duration::from_secs(30), "took {elapsed:?}");
}

#[test]
fn parse_retry_after_seconds() {
    assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
    assert_eq!(parse_retry_after(" 3 "), Some(Duration::from_secs(3)));
    assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
}

// ── connection failures ────────────────────────────────────────────

/// An address with nothing listening on it.
fn refused_address() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[test]
fn connection_refused_is_retried_then_reported() {
    let address = refused_address();

    // Three attempts with 200 ms and 400 ms of backoff between them.
    let client = client_with_backoff(2, Duration::from_millis(200));
    let started = Instant::now();
    match client.get(&format!("http://{address}/clip.mp4")) {
        Err(VidgrabError::Request { url, .. }) => assert!(url.contains(&address.to_string())),
        other => panic!("Expected Request error, got: {:?}", other.map(|r| r.status())),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(600), "took {elapsed:?}");
}

#[test]
fn connection_refused_without_retries_fails_at_once() {
    let address = refused_address();

    let client = client_with_backoff(0, Duration::from_secs(5));
    let started = Instant::now();
    assert!(matches!(
        client.get(&format!("http://{address}/clip.mp4")),
        Err(VidgrabError::Request { .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

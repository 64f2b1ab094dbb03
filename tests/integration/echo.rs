use crate::*;

use bytes::Bytes;

#[tokio::test]
async fn test_echo_returns_request_body() {
    let daemon = start_daemon().await.unwrap();

    let resp = reqwest::Client::new()
        .post(daemon.url("/echo"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "hello");
}

/// A chunked request body comes back whole and in order.
#[tokio::test]
async fn test_echo_streams_chunked_body() {
    let daemon = start_daemon_with(RelayConfig {
        channel_capacity: 1,
        ..RelayConfig::default()
    })
    .await
    .unwrap();

    let pieces: Vec<Result<Bytes, std::io::Error>> = (0..50)
        .map(|i| Ok(Bytes::from(format!("piece-{i:02};"))))
        .collect();
    let expected: String = (0..50).map(|i| format!("piece-{i:02};")).collect();

    let resp = reqwest::Client::new()
        .post(daemon.url("/echo"))
        .body(reqwest::Body::wrap_stream(futures::stream::iter(pieces)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), expected);

    assert!(eventually(|| daemon.transfers.stats().completed == 1).await);
    assert_eq!(daemon.transfers.stats().bytes, expected.len() as u64);
}

#[tokio::test]
async fn test_echo_of_empty_body_is_empty() {
    let daemon = start_daemon().await.unwrap();

    let resp = reqwest::Client::new()
        .post(daemon.url("/echo"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert!(resp.bytes().await.unwrap().is_empty());
}

/// A body that fails mid-stream truncates the echo with an error instead of
/// a clean end, and the transfer is recorded as failed.
#[tokio::test]
async fn test_echo_over_limit_aborts_response() {
    let daemon = start_daemon_with(RelayConfig {
        max_upload_bytes: 8,
        ..RelayConfig::default()
    })
    .await
    .unwrap();

    let result = reqwest::Client::new()
        .post(daemon.url("/echo"))
        .body("this body is longer than eight bytes")
        .send()
        .await;

    // Either the request itself errors out or the body ends with an error;
    // it never completes cleanly.
    let outcome = match result {
        Err(e) => Err(e),
        Ok(resp) => resp.text().await,
    };
    assert!(
        outcome.is_err(),
        "over-limit echo ended cleanly: {:?}",
        outcome.ok()
    );
    assert!(eventually(|| daemon.transfers.stats().failed == 1).await);
}

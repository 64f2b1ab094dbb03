use crate::*;

use sluice_core::digest;

/// Upload a multi-chunk file, list it, download it byte-for-byte.
#[tokio::test]
async fn test_upload_then_download_roundtrip() {
    let daemon = start_daemon_with(RelayConfig {
        read_buffer_bytes: 4096,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let data = payload(300_000);
    let client = reqwest::Client::new();

    let upload: serde_json::Value = client
        .put(daemon.url("/files/data.bin"))
        .body(data.clone())
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(upload["name"], "data.bin");
    assert_eq!(upload["bytes"], 300_000);
    assert_eq!(upload["digest"], hex_digest(&data));

    let listing: serde_json::Value = reqwest::get(daemon.url("/files"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["files"][0]["name"], "data.bin");
    assert_eq!(listing["files"][0]["bytes"], 300_000);

    let resp = reqwest::get(daemon.url("/files/data.bin")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.content_length(), Some(300_000));
    assert_eq!(
        resp.headers()["content-type"],
        "application/octet-stream"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..]);
}

/// Small read buffer and a one-slot channel: many relay round trips per file.
#[tokio::test]
async fn test_download_with_small_chunks() {
    use futures::StreamExt;

    let daemon = start_daemon_with(RelayConfig {
        read_buffer_bytes: 1024,
        channel_capacity: 1,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    let data = payload(64 * 1024);
    std::fs::write(daemon.store_dir.join("big.txt"), &data).unwrap();

    let resp = reqwest::get(daemon.url("/files/big.txt")).await.unwrap();
    assert_eq!(resp.headers()["content-type"], "text/plain");

    let mut stream = resp.bytes_stream();
    let mut received = Vec::new();
    while let Some(piece) = stream.next().await {
        received.extend_from_slice(&piece.unwrap());
    }
    assert_eq!(received, data);

    assert!(eventually(|| daemon.transfers.stats().completed == 1).await);
    assert_eq!(daemon.transfers.stats().bytes, 64 * 1024);
}

#[tokio::test]
async fn test_download_missing_file_is_404() {
    let daemon = start_daemon().await.unwrap();
    let resp = reqwest::get(daemon.url("/files/nope.txt")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

/// Path components in upload names are stripped; nothing escapes the store.
#[tokio::test]
async fn test_upload_name_is_sanitized() {
    let daemon = start_daemon().await.unwrap();
    let client = reqwest::Client::new();

    let upload: serde_json::Value = client
        .put(daemon.url("/files/..%2F..%2Fescape.txt"))
        .body("contained")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(upload["name"], "escape.txt");
    assert_eq!(
        std::fs::read_to_string(daemon.store_dir.join("escape.txt")).unwrap(),
        "contained"
    );
}

/// A body over the limit is rejected and leaves nothing in the store.
#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let daemon = start_daemon_with(RelayConfig {
        max_upload_bytes: 1024,
        ..RelayConfig::default()
    })
    .await
    .unwrap();

    let resp = reqwest::Client::new()
        .put(daemon.url("/files/too-big.bin"))
        .body(payload(4096))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(std::fs::read_dir(&daemon.store_dir).unwrap().count(), 0);
    assert!(eventually(|| daemon.transfers.stats().failed == 1).await);
}

/// Uploading over an existing name replaces it.
#[tokio::test]
async fn test_upload_replaces_existing_file() {
    let daemon = start_daemon().await.unwrap();
    let client = reqwest::Client::new();

    for body in ["first version", "second"] {
        client
            .put(daemon.url("/files/notes.txt"))
            .body(body)
            .send()
            .await
            .unwrap()
            .error_for_status()
            .unwrap();
    }

    let text = reqwest::get(daemon.url("/files/notes.txt"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "second");
}

fn hex_digest(data: &[u8]) -> String {
    digest(data).iter().map(|b| format!("{b:02x}")).collect()
}

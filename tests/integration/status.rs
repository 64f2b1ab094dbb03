use crate::*;

#[tokio::test]
async fn test_status_reports_transfer_totals() {
    let daemon = start_daemon().await.unwrap();

    let status: serde_json::Value = reqwest::get(daemon.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["transfers"]["completed"], 0);
    assert_eq!(status["transfers"]["active"], 0);
    assert!(status["version"].is_string());
    assert_eq!(
        status["storage_path"],
        daemon.store_dir.display().to_string()
    );

    reqwest::Client::new()
        .put(daemon.url("/files/a.txt"))
        .body("twelve bytes")
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    let status: serde_json::Value = reqwest::get(daemon.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["transfers"]["completed"], 1);
    assert_eq!(status["transfers"]["bytes"], 12);
}

/// A download held open by a slow reader shows up in /transfers.
#[tokio::test]
async fn test_transfers_lists_in_flight_download() {
    let daemon = start_daemon_with(RelayConfig {
        read_buffer_bytes: 1024,
        channel_capacity: 1,
        ..RelayConfig::default()
    })
    .await
    .unwrap();
    std::fs::write(daemon.store_dir.join("slow.bin"), payload(16 * 1024 * 1024)).unwrap();

    // Start the download but do not read the body.
    let held = reqwest::get(daemon.url("/files/slow.bin")).await.unwrap();
    assert!(held.status().is_success());

    let transfers: serde_json::Value = reqwest::get(daemon.url("/transfers"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = transfers["transfers"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["kind"], "download");
    assert_eq!(list[0]["label"], "slow.bin");

    // Dropping the response disconnects; the relay sees a sink failure.
    drop(held);
    assert!(eventually(|| daemon.transfers.stats().active == 0).await);
    assert_eq!(daemon.transfers.stats().failed, 1);
}

#[tokio::test]
async fn test_shutdown_endpoint_stops_server() {
    let mut daemon = start_daemon().await.unwrap();

    let resp: serde_json::Value = reqwest::Client::new()
        .post(daemon.url("/daemon/shutdown"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["message"], "Shutdown initiated");

    let server = daemon.server.take().unwrap();
    let exited = tokio::time::timeout(std::time::Duration::from_secs(5), server).await;
    assert!(exited.is_ok(), "server should stop after shutdown request");
}

//! Sluice integration test harness.
//!
//! Each test starts its own API server in-process on an ephemeral port,
//! backed by a fresh storage directory, and talks to it over real HTTP:
//!
//!   cargo test --test integration
//!
//! Tests must not share daemons; the handle returned by `start_daemon`
//! tears its server and directory down on drop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use sluice_api::ApiState;
use sluice_core::config::RelayConfig;
use sluice_services::{FileStore, TransferTable};

mod echo;
mod files;
mod status;

// ── Harness ───────────────────────────────────────────────────────────────────

static NEXT_DAEMON: AtomicUsize = AtomicUsize::new(0);

pub struct TestDaemon {
    pub addr: SocketAddr,
    pub store_dir: PathBuf,
    pub transfers: TransferTable,
    pub shutdown_tx: broadcast::Sender<()>,
    pub server: Option<JoinHandle<Result<()>>>,
}

impl TestDaemon {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/api{}", self.addr, path)
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(server) = self.server.take() {
            server.abort();
        }
        let _ = std::fs::remove_dir_all(&self.store_dir);
    }
}

pub async fn start_daemon() -> Result<TestDaemon> {
    start_daemon_with(RelayConfig::default()).await
}

/// Start a server with custom relay settings (small chunks, low limits).
pub async fn start_daemon_with(relay: RelayConfig) -> Result<TestDaemon> {
    let n = NEXT_DAEMON.fetch_add(1, Ordering::Relaxed);
    let store_dir =
        std::env::temp_dir().join(format!("sluice-it-{}-{}", std::process::id(), n));
    let _ = std::fs::remove_dir_all(&store_dir);
    let store = FileStore::new(&store_dir).context("failed to create store")?;

    let transfers = TransferTable::new();
    let (shutdown_tx, _) = broadcast::channel(1);
    let state = ApiState::new(transfers.clone(), store, relay, shutdown_tx.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let mut shutdown_rx = shutdown_tx.subscribe();
    let server = tokio::spawn(sluice_api::serve_on(listener, state, async move {
        let _ = shutdown_rx.recv().await;
    }));

    Ok(TestDaemon {
        addr,
        store_dir,
        transfers,
        shutdown_tx,
        server: Some(server),
    })
}

/// Deterministic, non-repeating-looking payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 7) % 256) as u8).collect()
}

/// Poll until `check` passes or ~1s elapses. Transfer bookkeeping settles a
/// moment after the client sees the last byte.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_answers_on_ephemeral_port() {
    let daemon = start_daemon().await.unwrap();
    let resp = reqwest::get(daemon.url("/status")).await.unwrap();
    assert!(resp.status().is_success());
}

//! Daemon status, transfers, shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    storage_path: String,
    transfers: TransferStats,
}

#[derive(Deserialize)]
struct TransferStats {
    active: usize,
    completed: u64,
    failed: u64,
    bytes: u64,
}

#[derive(Deserialize)]
struct TransfersResponse {
    transfers: Vec<TransferRecord>,
}

#[derive(Deserialize)]
struct TransferRecord {
    id: String,
    kind: String,
    label: String,
    bytes: u64,
    chunks: u64,
    elapsed_ms: u64,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Sluice Daemon Status (v{})", resp.version);
    println!("═══════════════════════════════════════");
    println!("  Uptime              : {}s", resp.uptime_secs);
    println!("  Storage             : {}", resp.storage_path);
    println!("  Active transfers    : {}", resp.transfers.active);
    println!("  Completed transfers : {}", resp.transfers.completed);
    println!("  Failed transfers    : {}", resp.transfers.failed);
    println!("  Bytes relayed       : {}", resp.transfers.bytes);

    Ok(())
}

pub async fn cmd_transfers(port: u16) -> Result<()> {
    let resp: TransfersResponse = get_json(&format!("{}/transfers", base_url(port))).await?;

    if resp.transfers.is_empty() {
        println!("No transfers in flight.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Active Transfers ({})", resp.transfers.len());
    println!("═══════════════════════════════════════");

    for t in &resp.transfers {
        println!("  ┌─ {} ({})", t.id, t.kind);
        println!("  │  label  : {}", t.label);
        println!("  │  bytes  : {}", t.bytes);
        println!("  │  chunks : {}", t.chunks);
        println!("  └─ age    : {}ms", t.elapsed_ms);
    }

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse =
        post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}

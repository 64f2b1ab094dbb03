//! /status, /transfers, /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use sluice_services::{TransferRecord, TransferStats};

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: u64,
    pub storage_path: String,
    pub transfers: TransferStats,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        storage_path: state.store.root().display().to_string(),
        transfers: state.transfers.stats(),
    })
}

// ── /transfers ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TransfersResponse {
    pub transfers: Vec<TransferRecord>,
}

pub async fn handle_transfers(State(state): State<ApiState>) -> Json<TransfersResponse> {
    Json(TransfersResponse {
        transfers: state.transfers.active(),
    })
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}

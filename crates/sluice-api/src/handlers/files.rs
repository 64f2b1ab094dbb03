//! /files handlers — stored files in and out, streamed.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sluice_core::Relay;
use sluice_services::{StoreError, StoredFile, TransferKind};

use super::{body_source, relay_status, relay_to_body, ApiState};

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        StoreError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

// ── GET /files ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<StoredFile>,
}

pub async fn handle_files(
    State(state): State<ApiState>,
) -> Result<Json<FilesResponse>, (StatusCode, String)> {
    let files = state
        .store
        .list()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(FilesResponse { files }))
}

// ── GET /files/{name} ─────────────────────────────────────────────────────────

pub async fn handle_download(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let (source, len) = state
        .store
        .open(&name, state.relay.read_buffer_bytes)
        .await
        .map_err(store_error)?;

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    tracing::info!(name, bytes = len, %mime, "serving file");

    let body = relay_to_body(&state, source, TransferKind::Download, &name);
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        body,
    )
        .into_response())
}

// ── PUT /files/{name} ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UploadResponse {
    pub name: String,
    pub bytes: u64,
    pub chunks: u64,
    pub digest: String,
}

pub async fn handle_upload(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Body,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let mut upload = state.store.create(&name).await.map_err(store_error)?;
    let mut guard = state.transfers.begin(TransferKind::Upload, upload.name());
    let source = body_source(body, state.relay.max_upload_bytes);

    let result = Relay::new(source, upload.sink())
        .observe(&mut guard)
        .run_until(state.shutdown_tx.subscribe())
        .await;

    match result {
        Ok(summary) => {
            let name = upload.name().to_string();
            upload
                .commit()
                .await
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            guard.complete(&summary);
            Ok(Json(UploadResponse {
                name,
                bytes: summary.bytes,
                chunks: summary.chunks,
                digest: hex::encode(summary.digest),
            }))
        }
        Err(e) => {
            upload.discard().await;
            let status = relay_status(&e);
            let message = e.to_string();
            guard.fail(&e);
            Err((status, message))
        }
    }
}

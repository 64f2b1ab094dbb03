//! HTTP API handlers — relays between HTTP bodies and stored files.

pub mod echo;
pub mod files;
pub mod status;

use std::io;
use std::time::Instant;

use axum::body::Body;
use axum::http::StatusCode;
use futures::{future, TryStreamExt};

use sluice_core::config::RelayConfig;
use sluice_core::{ChunkSource, Relay, RelayError};
use sluice_services::{channel, FileStore, StreamSource, TransferKind, TransferTable};

#[derive(Clone)]
pub struct ApiState {
    pub transfers: TransferTable,
    pub store: FileStore,
    pub relay: RelayConfig,
    pub started_at: Instant,
    /// Shutdown broadcast sender. Signals graceful daemon shutdown and
    /// cancels in-flight relays.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl ApiState {
    pub fn new(
        transfers: TransferTable,
        store: FileStore,
        relay: RelayConfig,
        shutdown_tx: tokio::sync::broadcast::Sender<()>,
    ) -> Self {
        Self {
            transfers,
            store,
            relay,
            started_at: Instant::now(),
            shutdown_tx,
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// A request body as a chunk source, failing once more than `limit` bytes
/// have arrived.
fn body_source(body: Body, limit: usize) -> StreamSource {
    let mut seen = 0usize;
    let limited = body
        .into_data_stream()
        .map_err(io::Error::other)
        .and_then(move |chunk| {
            seen += chunk.len();
            future::ready(if seen > limit {
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("body exceeds {} byte limit", limit),
                ))
            } else {
                Ok(chunk)
            })
        });
    StreamSource::new(limited)
}

/// Status code for a relay that ended in `error`.
fn relay_status(error: &RelayError) -> StatusCode {
    match error {
        RelayError::Source(e) if e.kind() == io::ErrorKind::InvalidData => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        RelayError::Source(_) => StatusCode::BAD_REQUEST,
        RelayError::Sink(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RelayError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Copy of an I/O error for handing to a response body after the relay
/// kept the original.
fn detach(error: &io::Error) -> io::Error {
    io::Error::new(error.kind(), error.to_string())
}

/// Spawn a relay from `source` into a response body and return the body.
///
/// If the source fails or the daemon shuts down mid-transfer, the body
/// ends with an error rather than a clean EOF so the client sees the
/// truncation. A client that goes away shows up as a sink failure.
fn relay_to_body<S>(state: &ApiState, source: S, kind: TransferKind, label: &str) -> Body
where
    S: ChunkSource + 'static,
{
    let (mut sink, body) = channel(state.relay.channel_capacity);
    let mut guard = state.transfers.begin(kind, label);
    let shutdown = state.shutdown_tx.subscribe();

    tokio::spawn(async move {
        let result = Relay::new(source, &mut sink)
            .observe(&mut guard)
            .run_until(shutdown)
            .await;
        match result {
            Ok(summary) => guard.complete(&summary),
            Err(e) => {
                match &e {
                    RelayError::Source(io) => sink.abort(detach(io)).await,
                    RelayError::Cancelled { .. } => {
                        sink.abort(io::Error::new(io::ErrorKind::Interrupted, "shutting down"))
                            .await
                    }
                    RelayError::Sink(_) => {}
                }
                guard.fail(&e);
            }
        }
    });

    Body::from_stream(body)
}

// Re-export handler functions for use in router setup.
pub use echo::handle_echo;
pub use files::{handle_download, handle_files, handle_upload};
pub use status::{handle_shutdown, handle_status, handle_transfers};

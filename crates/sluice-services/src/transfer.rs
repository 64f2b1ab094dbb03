//! Transfer table — tracks relays currently in flight.
//!
//! Each relay registers itself with [`TransferTable::begin`] and holds the
//! returned guard for its lifetime. The guard doubles as the relay's
//! observer, so byte counts in the table move as chunks are delivered.
//! Dropping the guard removes the entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use sluice_core::{RelayError, RelayObserver, TransferSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    /// Stored file → HTTP response.
    Download,
    /// HTTP request body → stored file.
    Upload,
    /// HTTP request body → HTTP response.
    Echo,
    /// TCP read half → TCP write half.
    Socket,
}

struct Entry {
    kind: TransferKind,
    label: String,
    started_at: Instant,
    bytes: AtomicU64,
    chunks: AtomicU64,
}

#[derive(Default)]
struct Totals {
    completed: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

/// Shared across the API and every relay task.
#[derive(Clone, Default)]
pub struct TransferTable {
    active: Arc<DashMap<u64, Arc<Entry>>>,
    next_id: Arc<AtomicU64>,
    totals: Arc<Totals>,
}

/// Point-in-time view of one active transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub id: String,
    pub kind: TransferKind,
    pub label: String,
    pub bytes: u64,
    pub chunks: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransferStats {
    pub active: usize,
    pub completed: u64,
    pub failed: u64,
    pub bytes: u64,
}

impl TransferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transfer. It stays listed until the guard is dropped.
    pub fn begin(&self, kind: TransferKind, label: impl Into<String>) -> TransferGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            kind,
            label: label.into(),
            started_at: Instant::now(),
            bytes: AtomicU64::new(0),
            chunks: AtomicU64::new(0),
        });
        self.active.insert(id, entry.clone());
        tracing::debug!(transfer = %format_id(id), ?kind, label = %entry.label, "transfer started");
        TransferGuard {
            table: self.clone(),
            id,
            entry,
            succeeded: false,
        }
    }

    /// Active transfers, oldest first.
    pub fn active(&self) -> Vec<TransferRecord> {
        let mut records: Vec<(u64, TransferRecord)> = self
            .active
            .iter()
            .map(|e| (*e.key(), record(*e.key(), e.value())))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        records.into_iter().map(|(_, r)| r).collect()
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            active: self.active.len(),
            completed: self.totals.completed.load(Ordering::Relaxed),
            failed: self.totals.failed.load(Ordering::Relaxed),
            bytes: self.totals.bytes.load(Ordering::Relaxed),
        }
    }
}

fn format_id(id: u64) -> String {
    hex::encode(id.to_be_bytes())
}

fn record(id: u64, entry: &Entry) -> TransferRecord {
    TransferRecord {
        id: format_id(id),
        kind: entry.kind,
        label: entry.label.clone(),
        bytes: entry.bytes.load(Ordering::Relaxed),
        chunks: entry.chunks.load(Ordering::Relaxed),
        elapsed_ms: entry.started_at.elapsed().as_millis() as u64,
    }
}

/// Live handle on one table entry.
///
/// Call [`complete`](Self::complete) or [`fail`](Self::fail) when the relay
/// returns. A guard dropped without either (the task was cancelled, the
/// client went away) counts as failed.
pub struct TransferGuard {
    table: TransferTable,
    id: u64,
    entry: Arc<Entry>,
    succeeded: bool,
}

impl TransferGuard {
    pub fn id(&self) -> String {
        format_id(self.id)
    }

    pub fn complete(mut self, summary: &TransferSummary) {
        self.succeeded = true;
        tracing::info!(
            transfer = %self.id(),
            kind = ?self.entry.kind,
            label = %self.entry.label,
            bytes = summary.bytes,
            chunks = summary.chunks,
            digest = %hex::encode(summary.digest),
            "transfer complete"
        );
    }

    pub fn fail(self, error: &RelayError) {
        if error.is_cancelled() {
            tracing::info!(transfer = %self.id(), label = %self.entry.label, "transfer cancelled");
        } else {
            tracing::warn!(
                transfer = %self.id(),
                label = %self.entry.label,
                error = %error,
                "transfer failed"
            );
        }
    }
}

impl RelayObserver for TransferGuard {
    fn on_chunk(&mut self, len: usize) {
        self.entry.bytes.fetch_add(len as u64, Ordering::Relaxed);
        self.entry.chunks.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.table.active.remove(&self.id);
        let totals = &self.table.totals;
        totals
            .bytes
            .fetch_add(self.entry.bytes.load(Ordering::Relaxed), Ordering::Relaxed);
        if self.succeeded {
            totals.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            totals.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

//! The relay loop — pull a chunk, hand it to the sink, repeat.
//!
//! One chunk is in flight at a time: the source is only asked for the
//! next chunk after the sink accepted the previous one. That sequencing
//! is the only backpressure there is.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::chunk::{ChunkSink, ChunkSource};
use crate::error::RelayError;

/// BLAKE3 digest of a byte slice.
pub fn digest(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Outcome of a relay that reached end of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub chunks: u64,
    pub bytes: u64,
    /// BLAKE3 over every relayed byte, independent of chunk boundaries.
    pub digest: [u8; 32],
    pub elapsed: Duration,
}

/// Notified after each chunk the sink accepted.
pub trait RelayObserver: Send {
    fn on_chunk(&mut self, len: usize);
}

impl RelayObserver for () {
    fn on_chunk(&mut self, _len: usize) {}
}

impl<T: RelayObserver> RelayObserver for &mut T {
    fn on_chunk(&mut self, len: usize) {
        (**self).on_chunk(len)
    }
}

/// A single transfer binding one source to one sink.
pub struct Relay<S, K, O = ()> {
    source: S,
    sink: K,
    observer: O,
}

impl<S: ChunkSource, K: ChunkSink> Relay<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            observer: (),
        }
    }
}

impl<S: ChunkSource, K: ChunkSink, O: RelayObserver> Relay<S, K, O> {
    /// Attach an observer that sees every delivered chunk.
    pub fn observe<P: RelayObserver>(self, observer: P) -> Relay<S, K, P> {
        Relay {
            source: self.source,
            sink: self.sink,
            observer,
        }
    }

    /// Relay until the source ends or either side fails.
    pub async fn run(self) -> Result<TransferSummary, RelayError> {
        self.drive(std::future::pending()).await
    }

    /// Like [`Relay::run`], but abandon the transfer when `shutdown` fires.
    ///
    /// A closed or lagged channel counts as a shutdown signal.
    pub async fn run_until(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<TransferSummary, RelayError> {
        self.drive(async move {
            let _ = shutdown.recv().await;
        })
        .await
    }

    async fn drive<F>(mut self, cancel: F) -> Result<TransferSummary, RelayError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);

        let started = Instant::now();
        let mut hasher = blake3::Hasher::new();
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut cancel => return Err(RelayError::Cancelled { bytes }),
                next = self.source.next_chunk() => next,
            };

            let chunk = match next.map_err(RelayError::Source)? {
                Some(chunk) => chunk,
                None => break,
            };
            if chunk.is_empty() {
                continue;
            }

            let len = chunk.len();
            hasher.update(&chunk);

            tokio::select! {
                biased;
                _ = &mut cancel => return Err(RelayError::Cancelled { bytes }),
                written = self.sink.write(chunk) => written.map_err(RelayError::Sink)?,
            }

            chunks += 1;
            bytes += len as u64;
            self.observer.on_chunk(len);
            tracing::trace!(chunks, bytes, "chunk relayed");
        }

        self.sink.finish().await.map_err(RelayError::Sink)?;

        let summary = TransferSummary {
            chunks,
            bytes,
            digest: *hasher.finalize().as_bytes(),
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            chunks = summary.chunks,
            bytes = summary.bytes,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "relay complete"
        );
        Ok(summary)
    }
}

/// Relay `source` into `sink` until end of data.
pub async fn relay<S: ChunkSource, K: ChunkSink>(
    source: S,
    sink: K,
) -> Result<TransferSummary, RelayError> {
    Relay::new(source, sink).run().await
}

/// Relay `source` into `sink`, abandoning on `shutdown`.
pub async fn relay_until<S: ChunkSource, K: ChunkSink>(
    source: S,
    sink: K,
    shutdown: broadcast::Receiver<()>,
) -> Result<TransferSummary, RelayError> {
    Relay::new(source, sink).run_until(shutdown).await
}

//! Adapters between relays and `futures::Stream`.
//!
//! HTTP bodies on both sides of the API are streams of `Bytes`:
//! [`StreamSource`] pulls from one, [`channel`] produces one.

use std::error::Error;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;

use sluice_core::{Chunk, ChunkSink, ChunkSource};

/// Chunk source over a fallible byte stream.
///
/// Stream errors that already are `io::Error`s pass through with their
/// kind intact; anything else becomes `ErrorKind::Other`.
pub struct StreamSource {
    stream: BoxStream<'static, io::Result<Bytes>>,
}

impl StreamSource {
    pub fn new<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>> + 'static,
    {
        Self {
            stream: stream.map_err(into_io_error).boxed(),
        }
    }
}

fn into_io_error<E>(error: E) -> io::Error
where
    E: Into<Box<dyn Error + Send + Sync>>,
{
    match error.into().downcast::<io::Error>() {
        Ok(io) => *io,
        Err(other) => io::Error::other(other),
    }
}

impl ChunkSource for StreamSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        self.stream.next().await.transpose()
    }
}

/// Bounded channel: the sink half feeds a relay's output into the body half.
///
/// `capacity` chunks may sit between the two before `write` waits.
pub fn channel(capacity: usize) -> (ChannelSink, ChannelBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx: Some(tx) }, ChannelBody { rx })
}

pub struct ChannelSink {
    tx: Option<mpsc::Sender<io::Result<Bytes>>>,
}

impl ChannelSink {
    /// End the body with an error instead of a clean end of stream, so
    /// the reader can tell a truncated transfer from a complete one.
    pub async fn abort(&mut self, error: io::Error) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(error)).await;
        }
    }

    fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "body receiver dropped")
    }
}

impl ChunkSink for ChannelSink {
    async fn write(&mut self, chunk: Chunk) -> io::Result<()> {
        match &self.tx {
            Some(tx) => tx.send(Ok(chunk)).await.map_err(|_| Self::closed()),
            None => Err(Self::closed()),
        }
    }

    async fn finish(&mut self) -> io::Result<()> {
        // Dropping the sender is the end-of-stream signal.
        self.tx.take();
        Ok(())
    }
}

/// Receiving half of [`channel`]; a `Stream` suitable as a response body.
pub struct ChannelBody {
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl Stream for ChannelBody {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

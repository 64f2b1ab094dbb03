//! Chunk sources and sinks.
//!
//! A source hands out chunks one at a time; a sink accepts them in the
//! order they are handed over. Neither side knows about the other; the
//! relay loop in [`crate::relay`] is the only thing that binds them.

use std::future::Future;
use std::io;

use bytes::Bytes;

/// A block of bytes as produced by a source. Size is whatever the source
/// had available; there is no framing.
pub type Chunk = Bytes;

/// Producer half of a relay.
pub trait ChunkSource: Send {
    /// Pull the next chunk.
    ///
    /// `Ok(None)` signals end of data. After an error or `None` the relay
    /// never calls this again.
    fn next_chunk(&mut self) -> impl Future<Output = io::Result<Option<Chunk>>> + Send;
}

/// Consumer half of a relay.
pub trait ChunkSink: Send {
    /// Accept one chunk. Returns once the chunk has been handed off.
    fn write(&mut self, chunk: Chunk) -> impl Future<Output = io::Result<()>> + Send;

    /// End of stream. Called at most once, and only after the source
    /// reported end of data.
    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl<T: ChunkSource> ChunkSource for &mut T {
    fn next_chunk(&mut self) -> impl Future<Output = io::Result<Option<Chunk>>> + Send {
        (**self).next_chunk()
    }
}

impl<T: ChunkSink> ChunkSink for &mut T {
    fn write(&mut self, chunk: Chunk) -> impl Future<Output = io::Result<()>> + Send {
        (**self).write(chunk)
    }

    fn finish(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        (**self).finish()
    }
}

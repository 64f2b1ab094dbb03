//! Chunk source over any `AsyncRead` — files, sockets, stdin.

use std::io;
use std::path::Path;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use sluice_core::{Chunk, ChunkSource};

pub struct ReaderSource<R> {
    reader: R,
    buf: BytesMut,
    max_chunk: usize,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    /// Chunks are at most `max_chunk` bytes; a short read yields a short chunk.
    pub fn new(reader: R, max_chunk: usize) -> Self {
        Self {
            reader,
            buf: BytesMut::with_capacity(max_chunk),
            max_chunk: max_chunk.max(1),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl ReaderSource<tokio::fs::File> {
    pub async fn open_file(path: impl AsRef<Path>, max_chunk: usize) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file, max_chunk))
    }
}

impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        self.buf.reserve(self.max_chunk);
        let n = (&mut self.reader)
            .take(self.max_chunk as u64)
            .read_buf(&mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.split().freeze()))
    }
}

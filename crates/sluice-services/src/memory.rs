//! In-memory source and sink, with optional failure injection.

use std::collections::VecDeque;
use std::io;

use bytes::Bytes;

use sluice_core::{Chunk, ChunkSink, ChunkSource};

/// Emits a fixed sequence of chunks, then ends (or fails).
pub struct MemorySource {
    chunks: VecDeque<Chunk>,
    fail_at_end: bool,
    requests: usize,
}

impl MemorySource {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            fail_at_end: false,
            requests: 0,
        }
    }

    /// Emit `chunks`, then fail on the next pull instead of ending.
    pub fn failing_after<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            fail_at_end: true,
            ..Self::new(chunks)
        }
    }

    /// How many times the source was pulled.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl ChunkSource for MemorySource {
    async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        self.requests += 1;
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.fail_at_end => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "memory source failed",
            )),
            None => Ok(None),
        }
    }
}

/// Accumulates everything written to it.
#[derive(Default)]
pub struct MemorySink {
    chunks: Vec<Chunk>,
    finished: usize,
    accept_limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` chunks, then fail every write after.
    pub fn failing_after(n: usize) -> Self {
        Self {
            accept_limit: Some(n),
            ..Self::default()
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.chunks.iter().map(Bytes::len).sum());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Number of end-of-stream signals received.
    pub fn finished(&self) -> usize {
        self.finished
    }
}

impl ChunkSink for MemorySink {
    async fn write(&mut self, chunk: Chunk) -> io::Result<()> {
        if self.accept_limit.is_some_and(|n| self.chunks.len() >= n) {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "memory sink rejected write",
            ));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.finished += 1;
        Ok(())
    }
}

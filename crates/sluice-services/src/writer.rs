//! Chunk sink over any `AsyncWrite`.

use std::io;
use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use sluice_core::{Chunk, ChunkSink};

pub struct WriterSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<tokio::fs::File> {
    /// Create (or truncate) `path`.
    pub async fn create_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(file))
    }
}

impl<W: AsyncWrite + Unpin + Send> ChunkSink for WriterSink<W> {
    async fn write(&mut self, chunk: Chunk) -> io::Result<()> {
        self.writer.write_all(&chunk).await
    }

    /// Flush, then shut down the write side. For sockets this sends FIN.
    async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::relay;

    use crate::MemorySource;

    #[tokio::test]
    async fn writes_every_chunk_in_order() {
        let source = MemorySource::new(["he", "llo", " ", "world"]);
        let mut sink = WriterSink::new(Vec::new());
        relay(source, &mut sink).await.unwrap();
        assert_eq!(sink.into_inner(), b"hello world");
    }

    #[tokio::test]
    async fn file_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("sluice-writer-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.txt");

        let sink = WriterSink::create_file(&path).await.unwrap();
        relay(MemorySource::new(["a", "b", "c"]), sink).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn duplex_pipe_carries_bytes_between_tasks() {
        let (client, server) = tokio::io::duplex(16);
        let (mut read_half, _) = tokio::io::split(server);

        let writer = tokio::spawn(async move {
            relay(MemorySource::new(["ping ", "pong"]), WriterSink::new(client)).await
        });

        let mut received = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut read_half, &mut received)
            .await
            .unwrap();
        writer.await.unwrap().unwrap();
        assert_eq!(received, b"ping pong");
    }
}

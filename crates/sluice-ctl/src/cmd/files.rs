//! File commands — list, get (download), put (upload). Both transfers
//! stream; neither side holds the whole file in memory.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::task::JoinHandle;

use sluice_core::{ChunkSource, Relay, RelayError, RelayObserver, TransferSummary};
use sluice_services::{
    channel, sanitize_filename, ChannelBody, ReaderSource, StreamSource, WriterSink,
};

use super::http::{base_url, check, get_json};

const READ_BUFFER_BYTES: usize = 64 * 1024;
const UPLOAD_CHANNEL_CAPACITY: usize = 8;
const PROGRESS_STEP: u64 = 1024 * 1024;

#[derive(Deserialize)]
struct FilesResponse {
    files: Vec<StoredFile>,
}

#[derive(Deserialize)]
struct StoredFile {
    name: String,
    bytes: u64,
}

#[derive(Deserialize)]
struct UploadResponse {
    name: String,
    bytes: u64,
    chunks: u64,
    digest: String,
}

fn file_url(port: u16, name: &str) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(&base_url(port))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL cannot carry a path"))?
        .push("files")
        .push(name);
    Ok(url)
}

/// Prints running byte counts to stderr.
struct Progress {
    total: Option<u64>,
    bytes: u64,
    printed_at: u64,
}

impl Progress {
    fn new(total: Option<u64>) -> Self {
        Self {
            total,
            bytes: 0,
            printed_at: 0,
        }
    }

    fn print(&self) {
        match self.total {
            Some(total) => eprint!("\r  {} / {} bytes", self.bytes, total),
            None => eprint!("\r  {} bytes", self.bytes),
        }
    }
}

impl RelayObserver for Progress {
    fn on_chunk(&mut self, len: usize) {
        self.bytes += len as u64;
        if self.bytes - self.printed_at >= PROGRESS_STEP || Some(self.bytes) == self.total {
            self.print();
            self.printed_at = self.bytes;
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.printed_at > 0 {
            eprintln!();
        }
    }
}

pub async fn cmd_files(port: u16) -> Result<()> {
    let resp: FilesResponse = get_json(&format!("{}/files", base_url(port))).await?;

    if resp.files.is_empty() {
        println!("No files stored yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Stored Files");
    println!("═══════════════════════════════════════");
    for file in &resp.files {
        println!("  {:<32} {:>12} bytes", file.name, file.bytes);
    }

    Ok(())
}

pub async fn cmd_get(port: u16, name: &str, out: Option<&str>) -> Result<()> {
    let url = file_url(port, name)?;
    let resp = reqwest::get(url.clone())
        .await
        .with_context(|| format!("failed to connect to sluiced at {} — is it running?", url))?;
    let resp = check(resp).await?;

    let out_path = out
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(sanitize_filename(name)));
    let sink = WriterSink::create_file(&out_path)
        .await
        .with_context(|| format!("failed to create {}", out_path.display()))?;

    let mut progress = Progress::new(resp.content_length());
    let result = Relay::new(StreamSource::new(resp.bytes_stream()), sink)
        .observe(&mut progress)
        .run()
        .await;
    drop(progress);

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            let _ = tokio::fs::remove_file(&out_path).await;
            return Err(e).with_context(|| format!("download of {} failed", name));
        }
    };

    println!("File downloaded:");
    println!("  Path   : {}", out_path.display());
    println!("  Bytes  : {}", summary.bytes);
    println!("  Chunks : {}", summary.chunks);
    println!("  BLAKE3 : {}", hex::encode(summary.digest));

    Ok(())
}

/// Relay `source` into a request body on a background task.
///
/// A local read failure ends the body with an error, so the server sees a
/// broken upload instead of a short one.
fn spawn_upload<S>(
    source: S,
    total: Option<u64>,
) -> (JoinHandle<Result<TransferSummary, RelayError>>, ChannelBody)
where
    S: ChunkSource + 'static,
{
    let (mut sink, body) = channel(UPLOAD_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        let result = Relay::new(source, &mut sink)
            .observe(Progress::new(total))
            .run()
            .await;
        if let Err(RelayError::Source(e)) = &result {
            sink.abort(std::io::Error::new(e.kind(), e.to_string())).await;
        }
        result
    });
    (task, body)
}

pub async fn cmd_put(port: u16, path: &str, name: Option<&str>) -> Result<()> {
    let name = match name {
        Some(n) => n.to_string(),
        None => Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string(),
    };

    let source = ReaderSource::open_file(path, READ_BUFFER_BYTES)
        .await
        .with_context(|| format!("failed to read file: {}", path))?;
    let total = tokio::fs::metadata(path).await.ok().map(|m| m.len());

    let url = file_url(port, &name)?;
    let (relay_task, body) = spawn_upload(source, total);
    let sent = reqwest::Client::new()
        .put(url.clone())
        .body(reqwest::Body::wrap_stream(body))
        .send()
        .await;

    // A local read failure explains a failed request better than the
    // request error does.
    let local = match relay_task.await.context("upload task panicked")? {
        Err(e @ RelayError::Source(_)) => {
            return Err(e).with_context(|| format!("failed to read file: {}", path))
        }
        other => other,
    };
    let resp = sent
        .with_context(|| format!("failed to connect to sluiced at {} — is it running?", url))?;
    let resp = check(resp).await?;
    let local = local.context("upload relay failed")?;

    let resp: UploadResponse = resp.json().await.context("failed to parse upload response")?;

    let verified = resp.digest == hex::encode(local.digest);
    println!("File uploaded:");
    println!("  Name   : {}", resp.name);
    println!("  Bytes  : {}", resp.bytes);
    println!("  Chunks : {} (sent {})", resp.chunks, local.chunks);
    println!(
        "  BLAKE3 : {} ({})",
        resp.digest,
        if verified { "verified" } else { "MISMATCH" }
    );

    if !verified {
        anyhow::bail!("server digest does not match the local file");
    }
    Ok(())
}

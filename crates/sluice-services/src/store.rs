//! File storage — the directory the API serves and uploads into.
//!
//! Uploads are written to a hidden `.{name}.{n}.part` file and renamed
//! into place on success, so a half-received upload is never listed or
//! served. `n` is unique per upload; concurrent uploads to one name never
//! share a part file, and the last to commit wins.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::reader::ReaderSource;
use crate::writer::WriterSink;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no such file: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub name: String,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a (sanitized) name maps to.
    pub fn resolve(&self, raw_name: &str) -> PathBuf {
        self.root.join(sanitize_filename(raw_name))
    }

    /// Open a stored file for relaying. Returns the source and the file size.
    pub async fn open(
        &self,
        raw_name: &str,
        max_chunk: usize,
    ) -> Result<(ReaderSource<tokio::fs::File>, u64), StoreError> {
        let path = self.resolve(raw_name);
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(sanitize_filename(raw_name)))
            }
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(sanitize_filename(raw_name)));
        }
        Ok((ReaderSource::new(file, max_chunk), meta.len()))
    }

    /// Start an upload. Nothing is visible under `raw_name` until
    /// [`Upload::commit`].
    pub async fn create(&self, raw_name: &str) -> Result<Upload, StoreError> {
        let name = sanitize_filename(raw_name);
        let dest = self.root.join(&name);
        let n = NEXT_PART.fetch_add(1, Ordering::Relaxed);
        let part = PartFile {
            path: self.root.join(format!(".{name}.{n}.part")),
            done: false,
        };
        let sink = WriterSink::create_file(&part.path).await?;
        Ok(Upload {
            name,
            sink,
            part,
            dest,
        })
    }

    /// Stored files sorted by name. Hidden files (in-flight uploads) are skipped.
    pub async fn list(&self) -> io::Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                files.push(StoredFile {
                    name,
                    bytes: meta.len(),
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

static NEXT_PART: AtomicU64 = AtomicU64::new(0);

/// An upload in progress. Dropping it without [`Upload::commit`] removes
/// the part file.
pub struct Upload {
    name: String,
    sink: WriterSink<tokio::fs::File>,
    part: PartFile,
    dest: PathBuf,
}

/// Part file path, removed on drop unless committed or discarded.
struct PartFile {
    path: PathBuf,
    done: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove abandoned upload");
            }
        }
    }
}

impl Upload {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sink to relay into.
    pub fn sink(&mut self) -> &mut WriterSink<tokio::fs::File> {
        &mut self.sink
    }

    /// Move the finished upload into place, replacing any existing file.
    pub async fn commit(self) -> io::Result<PathBuf> {
        drop(self.sink);
        let mut part = self.part;
        tokio::fs::rename(&part.path, &self.dest).await?;
        part.done = true;
        Ok(self.dest)
    }

    /// Throw the partial upload away.
    pub async fn discard(self) {
        drop(self.sink);
        let mut part = self.part;
        if let Err(e) = tokio::fs::remove_file(&part.path).await {
            tracing::warn!(path = %part.path.display(), error = %e, "failed to remove partial upload");
        }
        part.done = true;
    }
}

/// Sanitize a filename: strip path components, reject traversal attempts.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    // No hidden files, no ".." tricks.
    let trimmed = base.trim_start_matches('.');

    let clean: String = trimmed
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if clean.is_empty() {
        "uploaded_file".to_string()
    } else {
        clean
    }
}
